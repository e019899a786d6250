//! 请求日志导出（CSV）

use chrono::SecondsFormat;

use super::model::RequestLogEntry;

/// CSV 表头
pub const CSV_HEADER: &str = "Timestamp,Method,Status,Duration(ms),OperationName,Query";

/// 按 RFC 4180 转义单个字段
///
/// 查询文本总是加引号；其他字段只在包含逗号、引号或换行时加引号。
fn escape_field(value: &str, always_quote: bool) -> String {
    let needs_quote =
        always_quote || value.contains(',') || value.contains('"') || value.contains('\n');
    if needs_quote {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// 将单条记录渲染为一行 CSV（不含换行符）
pub fn csv_row(entry: &RequestLogEntry) -> String {
    [
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        entry.method.to_string(),
        entry.status.to_string(),
        entry.duration.to_string(),
        escape_field(entry.operation_name.as_deref().unwrap_or(""), false),
        escape_field(entry.query.as_deref().unwrap_or(""), true),
    ]
    .join(",")
}

/// 渲染完整的 CSV 文档（表头 + 每条记录一行）
pub fn to_csv(entries: &[RequestLogEntry]) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(entries.iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::model::HttpMethod;
    use chrono::{TimeZone, Utc};

    /// 按 RFC 4180 解析一行 CSV（测试用）
    fn parse_row(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                ('"', true) => in_quotes = false,
                ('"', false) => in_quotes = true,
                (',', false) => fields.push(std::mem::take(&mut current)),
                (c, _) => current.push(c),
            }
        }
        fields.push(current);
        fields
    }

    fn sample_entry() -> RequestLogEntry {
        RequestLogEntry::new(HttpMethod::Post, 42.0, 200)
            .with_timestamp(Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap())
            .with_operation_name("Greet")
            .with_query(r#"query { greet(msg: "say "hi"") }"#)
    }

    #[test]
    fn test_header_first() {
        let csv = to_csv(&[]);
        assert_eq!(csv, CSV_HEADER);
    }

    #[test]
    fn test_quotes_are_doubled() {
        let entry = RequestLogEntry::new(HttpMethod::Post, 1.0, 200).with_query(r#"say "hi""#);
        let row = csv_row(&entry);
        assert!(row.ends_with(r#""say ""hi""""#));
    }

    #[test]
    fn test_row_reparses_to_same_fields() {
        let entry = sample_entry();
        let csv = to_csv(&[entry.clone()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);

        let fields = parse_row(lines[1]);
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], "2026-10-17T08:00:00.000Z");
        assert_eq!(fields[1], "POST");
        assert_eq!(fields[2], "200");
        assert_eq!(fields[3], "42");
        assert_eq!(fields[4], "Greet");
        assert_eq!(fields[5], entry.query.unwrap());
    }

    #[test]
    fn test_missing_optional_fields() {
        let entry = RequestLogEntry::new(HttpMethod::Get, 3.5, 500);
        let fields = parse_row(&csv_row(&entry));
        assert_eq!(fields[3], "3.5");
        assert_eq!(fields[4], "");
        assert_eq!(fields[5], "");
    }
}
