use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Multiple-sequence alignment keyed by sequence identifier. The identifier
/// is the first whitespace-delimited token of the FASTA header line.
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    sequences: HashMap<String, String>,
}

impl Alignment {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.sequences.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Number of alignment columns (length of the longest sequence).
    pub fn columns(&self) -> usize {
        self.sequences
            .values()
            .map(|seq| seq.chars().count())
            .max()
            .unwrap_or(0)
    }
}

pub fn load_alignment(path: &Path) -> Result<Alignment> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read alignment file: {}", path.display()))?;
    parse_alignment(&raw)
}

pub fn parse_alignment(raw: &str) -> Result<Alignment> {
    let mut sequences = HashMap::new();
    let mut current_id: Option<String> = None;
    let mut current_seq = String::new();

    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            if let Some(id) = current_id.take() {
                sequences.insert(id, std::mem::take(&mut current_seq));
            }
            let id = header
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_string();
            if id.is_empty() {
                bail!("alignment contains a FASTA record with an empty identifier");
            }
            current_id = Some(id);
        } else {
            if current_id.is_none() {
                bail!("alignment does not start with a FASTA header line");
            }
            current_seq.push_str(line.trim());
        }
    }

    if let Some(id) = current_id.take() {
        sequences.insert(id, current_seq);
    }

    if sequences.is_empty() {
        bail!("alignment file contains no sequences");
    }

    Ok(Alignment { sequences })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiline_records() {
        let aln = parse_alignment(">A desc1\nMKV\nLLA\n>B\nMKI--A\n").unwrap();
        assert_eq!(aln.len(), 2);
        assert_eq!(aln.get("A"), Some("MKVLLA"));
        assert_eq!(aln.get("B"), Some("MKI--A"));
        assert_eq!(aln.columns(), 6);
    }

    #[test]
    fn header_id_is_first_token() {
        let aln = parse_alignment(">tyr1 some annotation\nMK\n").unwrap();
        assert_eq!(aln.get("tyr1"), Some("MK"));
        assert!(aln.get("tyr1 some annotation").is_none());
    }

    #[test]
    fn rejects_headerless_input() {
        assert!(parse_alignment("MKVLLA\n").is_err());
        assert!(parse_alignment("").is_err());
    }
}
