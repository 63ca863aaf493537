/// Normalize prose source before rendering.
///
/// CRLF and bare CR line endings become LF, every line is right-trimmed,
/// and any run of two or more consecutive empty lines collapses to exactly
/// one. The pass is idempotent.
pub fn normalize_prose(source: &str) -> String {
    let unified = source.replace("\r\n", "\n").replace('\r', "\n");
    let mut kept: Vec<&str> = Vec::new();
    let mut prev_blank = false;
    for line in unified.split('\n') {
        let line = line.trim_end();
        let blank = line.is_empty();
        if !(blank && prev_blank) {
            kept.push(line);
        }
        prev_blank = blank;
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_blank_runs_and_line_endings() {
        assert_eq!(normalize_prose("a\r\n\r\n\r\nb"), "a\n\nb");
        assert_eq!(normalize_prose("a\rb\r\nc"), "a\nb\nc");
    }

    #[test]
    fn right_trims_every_line() {
        assert_eq!(normalize_prose("a  \nb\t"), "a\nb");
    }

    #[test]
    fn whitespace_only_lines_count_as_blank() {
        assert_eq!(normalize_prose("a\n   \n\t\nb"), "a\n\nb");
    }

    #[test]
    fn is_idempotent() {
        for source in ["a\r\n\r\n\r\nb", "x  \n\n\n\ny\n", "", "\n\n\n", "plain"] {
            let once = normalize_prose(source);
            assert_eq!(normalize_prose(&once), once);
        }
    }
}
