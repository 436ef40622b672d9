//! Decoding of single causal profile log lines
//!
//! Every line of a profile log has the form
//! `command<TAB>key1=value1<TAB>key2=value2...`. Decoding only splits the
//! line; it attaches no meaning to commands or values.

use std::io::BufRead;
use std::str::FromStr;

use crate::error::LogError;

pub const FIELD_DELIMITER: char = '\t';

/// A decoded log line: the command keyword and its fields in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub command: String,
    pub fields: Vec<(String, String)>,
}

impl LogLine {
    /// Raw value of the first field named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a field that must be present.
    pub fn str_field(&self, key: &str) -> Result<&str, LogError> {
        self.get(key).ok_or_else(|| LogError::MissingField {
            line: 0,
            command: self.command.clone(),
            key: key.to_string(),
        })
    }

    /// Parse a field that must be present.
    pub fn parse_field<T: FromStr>(&self, key: &str) -> Result<T, LogError> {
        let raw = self.str_field(key)?;
        parse_value(key, raw)
    }

    /// Parse a field that may be absent.
    pub fn parse_opt_field<T: FromStr>(&self, key: &str) -> Result<Option<T>, LogError> {
        self.get(key).map(|raw| parse_value(key, raw)).transpose()
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, LogError> {
    raw.parse::<T>().map_err(|_| LogError::FieldType {
        line: 0,
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Split one line into its command and `key=value` fields.
///
/// Surrounding whitespace (including the line terminator) is ignored. A value
/// is everything after the first `=` of its field.
pub fn decode_line(line: &str) -> Result<LogLine, LogError> {
    let line = line.trim();
    let (command, rest) =
        line.split_once(FIELD_DELIMITER)
            .ok_or_else(|| LogError::MalformedLine {
                line: 0,
                reason: format!("no field delimiter in '{}'", line),
            })?;

    let fields = rest
        .split(FIELD_DELIMITER)
        .map(|field| {
            field
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| LogError::MalformedLine {
                    line: 0,
                    reason: format!("field '{}' of '{}' has no '='", field, command),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LogLine {
        command: command.to_string(),
        fields,
    })
}

/// Lazy, finite sequence of decoded lines read from `reader`.
///
/// Blank lines are skipped. Errors carry the 1-based number of the line that
/// caused them. The sequence cannot be restarted; once an error has been
/// yielded the caller is expected to stop.
pub struct LogLines<R> {
    reader: R,
    buffer: String,
    line_number: usize,
}

impl<R: BufRead> LogLines<R> {
    pub fn new(reader: R) -> Self {
        LogLines {
            reader,
            buffer: String::new(),
            line_number: 0,
        }
    }

    /// Number of physical lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for LogLines<R> {
    type Item = Result<LogLine, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_number += 1;

            if self.buffer.trim().is_empty() {
                continue;
            }

            let line_number = self.line_number;
            return Some(decode_line(&self.buffer).map_err(|e| e.at_line(line_number)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_command_and_fields_in_order() {
        let line = decode_line("start-experiment\tline=main.c:12\ttime=100\tglobal-delays=0\n")
            .unwrap();
        assert_eq!(line.command, "start-experiment");
        assert_eq!(
            line.fields,
            vec![
                ("line".to_string(), "main.c:12".to_string()),
                ("time".to_string(), "100".to_string()),
                ("global-delays".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn value_is_everything_after_first_equals() {
        let line = decode_line("info\tnote=a=b=c").unwrap();
        assert_eq!(line.get("note"), Some("a=b=c"));
    }

    #[test]
    fn empty_value_is_allowed() {
        let line = decode_line("counter\tname=\tvalue=3").unwrap();
        assert_eq!(line.get("name"), Some(""));
    }

    #[test]
    fn line_without_delimiter_is_malformed() {
        let err = decode_line("shutdown").unwrap_err();
        assert!(matches!(err, LogError::MalformedLine { .. }));
    }

    #[test]
    fn field_without_equals_is_malformed() {
        let err = decode_line("startup\ttime=1\tbogus").unwrap_err();
        match err {
            LogError::MalformedLine { reason, .. } => assert!(reason.contains("bogus")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn typed_fields() {
        let line = decode_line("end-round\tdelays=4\tdelay-size=x\ttime=99").unwrap();
        assert_eq!(line.parse_field::<u64>("delays").unwrap(), 4);
        assert_eq!(line.parse_opt_field::<u64>("missing").unwrap(), None);

        match line.parse_field::<u64>("delay-size").unwrap_err() {
            LogError::FieldType { key, value, .. } => {
                assert_eq!(key, "delay-size");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected error {other:?}"),
        }

        match line.parse_field::<u64>("line").unwrap_err() {
            LogError::MissingField { command, key, .. } => {
                assert_eq!(command, "end-round");
                assert_eq!(key, "line");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn log_lines_skip_blank_lines_and_number_errors() {
        let input = "startup\ttime=1\n\n\ncounter\tname=a\tvalue=2\nbroken\n";
        let mut lines = LogLines::new(input.as_bytes());

        assert_eq!(lines.next().unwrap().unwrap().command, "startup");
        assert_eq!(lines.next().unwrap().unwrap().command, "counter");
        let err = lines.next().unwrap().unwrap_err();
        assert_eq!(err.line(), Some(5));
        assert!(lines.next().is_none());
        assert_eq!(lines.lines_read(), 5);
    }
}
