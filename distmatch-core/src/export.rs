use std::io::Write;
use std::path::Path;

use distmatch_common::{DistMatchError, Result};

use crate::results::MatchResults;

// --- JSON export ---

pub fn export_json(output_path: &Path, results: &MatchResults) -> Result<()> {
    let doc = serde_json::json!({
        "match_count": results.len(),
        "matches": results.as_slice(),
    });
    let mut file = std::io::BufWriter::new(std::fs::File::create(output_path)?);
    serde_json::to_writer_pretty(&mut file, &doc)
        .map_err(|e| DistMatchError::Other(e.to_string()))?;
    file.flush()?;
    Ok(())
}

// --- CSV export ---

pub fn export_csv(output_path: &Path, results: &MatchResults) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(output_path)?);
    writeln!(file, "source_table,source_column,target_table,target_column,similarity")?;
    for m in results {
        writeln!(
            file,
            "{},{},{},{},{:.6}",
            csv_field(&m.source_table),
            csv_field(&m.source_column),
            csv_field(&m.target_table),
            csv_field(&m.target_column),
            m.similarity,
        )?;
    }
    file.flush()?;
    Ok(())
}

// wrap in quotes if it contains a comma, quote or newline
fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Match;

    fn results() -> MatchResults {
        MatchResults::new(vec![
            Match {
                source_table: "orders".into(),
                source_column: "id".into(),
                target_table: "invoices".into(),
                target_column: "order, id".into(),
                similarity: 1.0,
            },
            Match {
                source_table: "orders".into(),
                source_column: "say \"hi\"".into(),
                target_table: "invoices".into(),
                target_column: "note".into(),
                similarity: 0.25,
            },
        ])
    }

    #[test]
    fn csv_escapes_fields() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.csv");
        export_csv(&path, &results()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "source_table,source_column,target_table,target_column,similarity");
        assert_eq!(lines[1], "orders,id,invoices,\"order, id\",1.000000");
    }

    #[test]
    fn json_lists_matches_in_rank_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.json");
        export_json(&path, &results()).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["match_count"], 2);
        assert_eq!(doc["matches"][0]["target_column"], "order, id");
        assert_eq!(doc["matches"][1]["similarity"], 0.25);
    }
}
