// tests/test_ingest.rs

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use edgeviz::graph::{NodeId, SchemaError, SelfLoopPolicy};
use edgeviz::ingest::{
    is_workbook, load_graph, read_rows, read_rows_from_reader, HeaderMode, IngestError, IngestOptions,
};

/// First worksheet holds the canonical header and three edges with numeric
/// lengths 10, 5.5 and 7.
const WORKBOOK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/edges.xlsx");

fn table(contents: &str) -> io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_graph_from_csv() -> Result<(), Box<dyn std::error::Error>> {
        let file = table("Node A,Node B,id,length\nA,B,e1,10.0\nB,C,e2,5\n")?;
        let graph = load_graph(file.path(), &IngestOptions::default())?;

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges()[1].b, NodeId::from("C"));
        assert_eq!(graph.edges()[1].length, 5.0);
        Ok(())
    }

    /// Header names are matched ignoring case, spaces, `_` and `-`.
    #[test]
    fn test_header_variants_accepted() -> Result<(), Box<dyn std::error::Error>> {
        for header in ["node_a,node_b,ID,Length", "NodeA,node-b,id,LENGTH", "\u{feff}Node A,Node B,id,length"] {
            let file = table(&format!("{}\nA,B,e1,1\n", header))?;
            let graph = load_graph(file.path(), &IngestOptions::default())?;
            assert_eq!(graph.edge_count(), 1, "header '{}'", header);
        }
        Ok(())
    }

    /// Unexpected column names fail unless positional headers are allowed.
    #[test]
    fn test_header_names_validated() -> Result<(), Box<dyn std::error::Error>> {
        let file = table("from,to,name,weight\nA,B,e1,1\n")?;

        let err = load_graph(file.path(), &IngestOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema(SchemaError::HeaderName { column: 1, .. })
        ));

        let positional = IngestOptions {
            header: HeaderMode::Positional,
            ..IngestOptions::default()
        };
        let graph = load_graph(file.path(), &positional)?;
        assert_eq!(graph.edge_count(), 1);
        Ok(())
    }

    #[test]
    fn test_header_width_checked() -> io::Result<()> {
        let file = table("Node A,Node B,id\nA,B,e1\n")?;
        let positional = IngestOptions {
            header: HeaderMode::Positional,
            ..IngestOptions::default()
        };
        let err = load_graph(file.path(), &positional).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema(SchemaError::HeaderWidth { expected: 4, found: 3 })
        ));
        Ok(())
    }

    #[test]
    fn test_headerless_tsv() -> Result<(), Box<dyn std::error::Error>> {
        let file = table("1\t2\ta\t0.5\n2\t3\tb\t1.5\n")?;
        let options = IngestOptions {
            delimiter: b'\t',
            header: HeaderMode::None,
            ..IngestOptions::default()
        };
        let graph = load_graph(file.path(), &options)?;
        let nodes: Vec<_> = graph.nodes().iter().map(|n| n.as_str()).collect();
        assert_eq!(nodes, vec!["1", "2", "3"]);
        Ok(())
    }

    /// A short row is a schema error naming its data row.
    #[test]
    fn test_short_row_rejected() -> io::Result<()> {
        let file = table("Node A,Node B,id,length\nA,B,e1,1\nB,C,e2\n")?;
        let err = load_graph(file.path(), &IngestOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema(SchemaError::FieldCount { row: 2, found: 3, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_non_numeric_length_rejected() -> io::Result<()> {
        let file = table("Node A,Node B,id,length\nA,B,e1,long\n")?;
        let err = load_graph(file.path(), &IngestOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema(SchemaError::InvalidLength { row: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_self_loop_policy_applied() -> io::Result<()> {
        let file = table("Node A,Node B,id,length\nX,X,loop,1\n")?;
        let options = IngestOptions {
            self_loops: SelfLoopPolicy::Reject,
            ..IngestOptions::default()
        };
        let err = load_graph(file.path(), &options).unwrap_err();
        assert!(matches!(err, IngestError::Schema(SchemaError::SelfLoop { .. })));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_graph("/nonexistent/edges.csv", &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[test]
    fn test_read_rows_from_reader_keeps_quoted_fields() -> Result<(), Box<dyn std::error::Error>> {
        let data = "Node A,Node B,id,length\n\"New York\",Boston,\"I-95, north\",306.2\n";
        let rows = read_rows_from_reader(data.as_bytes(), &IngestOptions::default())?;
        assert_eq!(
            rows,
            vec![vec![
                "New York".to_string(),
                "Boston".to_string(),
                "I-95, north".to_string(),
                "306.2".to_string()
            ]]
        );
        Ok(())
    }

    #[test]
    fn test_empty_table_gives_empty_graph() -> Result<(), Box<dyn std::error::Error>> {
        let file = table("Node A,Node B,id,length\n")?;
        let graph = load_graph(file.path(), &IngestOptions::default())?;
        assert!(graph.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_graph_from_workbook() -> Result<(), Box<dyn std::error::Error>> {
        let graph = load_graph(WORKBOOK, &IngestOptions::default())?;

        let nodes: Vec<_> = graph.nodes().iter().map(|n| n.as_str()).collect();
        assert_eq!(nodes, vec!["A", "B", "C"]);
        assert_eq!(graph.edge_count(), 3);
        let lengths: Vec<_> = graph
            .edges()
            .iter()
            .map(|e| (e.id.as_str(), e.length, e.length_text.as_str()))
            .collect();
        assert_eq!(lengths, vec![("e1", 10.0, "10"), ("e2", 5.5, "5.5"), ("e3", 7.0, "7")]);
        Ok(())
    }

    /// Workbook headers go through the same checks as delimited ones.
    #[test]
    fn test_workbook_header_policy() -> Result<(), Box<dyn std::error::Error>> {
        let headerless = IngestOptions {
            header: HeaderMode::None,
            ..IngestOptions::default()
        };
        let rows = read_rows(WORKBOOK, &headerless)?;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["Node A", "Node B", "id", "length"]);

        let err = load_graph(WORKBOOK, &headerless).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema(SchemaError::InvalidLength { row: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_workbook_detected_by_extension() {
        assert!(is_workbook(Path::new("edges.xlsx")));
        assert!(is_workbook(Path::new("EDGES.XLSX")));
        assert!(is_workbook(Path::new("edges.ods")));
        assert!(!is_workbook(Path::new("edges.csv")));
        assert!(!is_workbook(Path::new("xlsx")));
    }

    #[test]
    fn test_missing_workbook_is_workbook_error() {
        let err = load_graph("/nonexistent/edges.xlsx", &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Workbook(_)));
    }
}
