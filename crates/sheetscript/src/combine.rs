//! Optimization pass that fuses adjacent code chunks

use log::debug;

use crate::code_chunks::CodeChunk;

/// One left-to-right pass, folding every chunk into its left neighbour
/// where possible. Returns the new chunks and the number of merges.
fn combine_pass(code_chunks: Vec<CodeChunk>) -> (Vec<CodeChunk>, usize) {
    let mut combined: Vec<CodeChunk> = Vec::with_capacity(code_chunks.len());
    let mut merges = 0;

    for chunk in code_chunks {
        let fused = combined.last().and_then(|last| last.combine_right(&chunk));
        match fused {
            Some(fused) => {
                debug!("Combined two {} chunks", fused.get_display_name());
                if let Some(last) = combined.last_mut() {
                    *last = fused;
                }
                merges += 1;
            }
            None => combined.push(chunk),
        }
    }

    (combined, merges)
}

/// Combine adjacent chunks until no further merge applies.
///
/// The relative order of chunks is kept; a fused chunk takes the place of
/// the chunks it replaces.
pub fn combine_code_chunks(mut code_chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
    loop {
        let before = code_chunks.len();
        let (combined, merges) = combine_pass(code_chunks);
        code_chunks = combined;
        if merges == 0 {
            debug!("Chunk combination settled at {} chunks", code_chunks.len());
            return code_chunks;
        }
        debug!("Combination pass reduced {before} chunks to {}", code_chunks.len());
    }
}

/// Apply every optimization to a chunk list before emission
pub fn optimize_code_chunks(code_chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
    combine_code_chunks(code_chunks)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        code_chunks::{ExcelRangeImport, ExcelRangeImportCodeChunk, ReplaceCodeChunk},
        state::State,
    };

    fn import(sheet_name: &str, df_name: &str) -> CodeChunk {
        CodeChunk::ExcelRangeImport(ExcelRangeImportCodeChunk::new(
            Arc::new(State::default()),
            Arc::new(State::default()),
            "data.xlsx".to_string(),
            sheet_name.to_string(),
            vec![ExcelRangeImport::Range {
                df_name: df_name.to_string(),
                value: "A1:B2".to_string(),
            }],
            vec![df_name.to_string()],
            false,
        ))
    }

    fn replace() -> CodeChunk {
        CodeChunk::Replace(ReplaceCodeChunk::new(
            Arc::new(State::default()),
            Arc::new(State::default()),
            0,
            Vec::new(),
            "a".to_string(),
            "b".to_string(),
        ))
    }

    fn names(chunks: &[CodeChunk]) -> Vec<Vec<String>> {
        chunks
            .iter()
            .map(|chunk| match chunk {
                CodeChunk::ExcelRangeImport(chunk) => chunk.new_df_names.clone(),
                other => vec![other.get_display_name().to_string()],
            })
            .collect()
    }

    #[test]
    fn test_adjacent_imports_fuse() {
        let chunks = combine_code_chunks(vec![
            import("Sheet1", "a"),
            import("Sheet1", "b"),
            import("Sheet1", "c"),
        ]);
        assert_eq!(names(&chunks), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_unrelated_chunks_stay_in_order() {
        let chunks = combine_code_chunks(vec![
            import("Sheet1", "a"),
            replace(),
            import("Sheet1", "b"),
            import("Sheet2", "c"),
            import("Sheet2", "d"),
        ]);
        assert_eq!(
            names(&chunks),
            vec![
                vec!["a".to_string()],
                vec!["Replace".to_string()],
                vec!["b".to_string()],
                vec!["c".to_string(), "d".to_string()],
            ]
        );
    }

    #[test]
    fn test_fusion_is_associative() {
        let (a, b, c) = (
            import("Sheet1", "a"),
            import("Sheet1", "b"),
            import("Sheet1", "c"),
        );
        let left = a.combine_right(&b).unwrap().combine_right(&c).unwrap();
        let right = a.combine_right(&b.combine_right(&c).unwrap()).unwrap();
        assert_eq!(names(&[left]), names(&[right]));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(combine_code_chunks(Vec::new()).is_empty());
        assert_eq!(combine_code_chunks(vec![replace()]).len(), 1);
    }
}
