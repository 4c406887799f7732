//! Row-tuple accumulation for multi-row INSERT statements.

use crate::values::quote_ident;

/// Accumulates rendered row tuples and emits a multi-row `INSERT` whenever
/// the configured batch size is reached, bounding both memory use and the
/// size of any single statement in the exported script.
#[derive(Debug)]
pub struct InsertBatcher {
    table: String,
    column_list: String,
    batch_size: usize,
    tuples: Vec<String>,
}

impl InsertBatcher {
    pub fn new(table: &str, columns: &[String], batch_size: usize) -> Self {
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            table: table.to_string(),
            column_list,
            batch_size,
            tuples: Vec::new(),
        }
    }

    /// Adds one parenthesized tuple; returns a complete INSERT statement
    /// when the batch threshold is reached.
    pub fn push(&mut self, tuple: String) -> Option<String> {
        self.tuples.push(tuple);
        if self.tuples.len() >= self.batch_size {
            Some(self.build_statement())
        } else {
            None
        }
    }

    /// Flushes any remaining tuples at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.tuples.is_empty() {
            None
        } else {
            Some(self.build_statement())
        }
    }

    fn build_statement(&mut self) -> String {
        let stmt = format!(
            "INSERT INTO {} ({}) VALUES\n{};\n\n",
            quote_ident(&self.table),
            self.column_list,
            self.tuples.join(",\n")
        );
        self.tuples.clear();
        stmt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    #[test]
    fn flushes_at_threshold() {
        let mut batcher = InsertBatcher::new("orders", &columns(), 2);

        assert!(batcher.push("(1, 'a')".to_string()).is_none());
        let stmt = batcher.push("(2, 'b')".to_string()).unwrap();
        assert!(stmt.starts_with("INSERT INTO `orders` (`id`, `name`) VALUES\n"));
        assert!(stmt.contains("(1, 'a'),\n(2, 'b');\n"));
    }

    #[test]
    fn finish_flushes_remainder() {
        let mut batcher = InsertBatcher::new("orders", &columns(), 100);
        batcher.push("(1, 'a')".to_string());

        let stmt = batcher.finish().unwrap();
        assert!(stmt.contains("(1, 'a');\n"));
        assert!(batcher.finish().is_none());
    }

    #[test]
    fn batch_counts_for_2500_rows_at_1000() {
        let mut batcher = InsertBatcher::new("t", &columns(), 1000);
        let mut statements = Vec::new();

        for i in 0..2500 {
            if let Some(stmt) = batcher.push(format!("({}, 'x')", i)) {
                statements.push(stmt);
            }
        }
        if let Some(stmt) = batcher.finish() {
            statements.push(stmt);
        }

        assert_eq!(statements.len(), 3);
        // every tuple starts a line: one after "VALUES\n", one per ",\n"
        let counts: Vec<usize> = statements
            .iter()
            .map(|s| s.matches("\n(").count())
            .collect();
        assert_eq!(counts, vec![1000, 1000, 500]);
    }

    #[test]
    fn empty_stream_emits_nothing() {
        let mut batcher = InsertBatcher::new("t", &columns(), 10);
        assert!(batcher.finish().is_none());
    }
}
