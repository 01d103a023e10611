//! Spreadsheet-safe CSV assembly for the export endpoints.

fn escape_cell(value: &str) -> String {
    let mut cell = value.replace('"', "\"\"");
    // Guard against formula injection when the file is opened in a
    // spreadsheet.
    if matches!(cell.as_bytes().first(), Some(b'=' | b'+' | b'-' | b'@')) {
        cell.insert(0, '\'');
    }
    format!("\"{}\"", cell)
}

pub fn append_csv_row(buffer: &mut String, fields: &[String]) {
    let row: Vec<String> = fields.iter().map(|field| escape_cell(field)).collect();
    buffer.push_str(&row.join(","));
    buffer.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_quoted_and_comma_separated() {
        let mut buffer = String::new();
        append_csv_row(&mut buffer, &["a".into(), "b,c".into()]);
        assert_eq!(buffer, "\"a\",\"b,c\"\n");
    }

    #[test]
    fn formula_prefixes_are_guarded() {
        let mut buffer = String::new();
        append_csv_row(&mut buffer, &["=SUM(A1)".into()]);
        assert_eq!(buffer, "\"'=SUM(A1)\"\n");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let mut buffer = String::new();
        append_csv_row(&mut buffer, &["he said \"hi\"".into()]);
        assert_eq!(buffer, "\"he said \"\"hi\"\"\"\n");
    }
}
