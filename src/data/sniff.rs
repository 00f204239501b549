/// Delimiters tried in order of preference
static CANDIDATES: [u8; 4] = [b';', b',', b' ', b'\t'];

/// Guess the delimiter of a delimited text sample
///
/// A candidate qualifies when it occurs the same, non-zero number of times on every sampled line
/// (quoted text not counted). If the sample was cut off mid-file its last line is incomplete and
/// is left out.
pub fn sniff_delimiter(sample: &str, truncated: bool) -> Option<u8> {
    let mut lines: Vec<&str> = sample.lines().collect();
    if truncated && lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    let lines: Vec<&str> = lines.into_iter().filter(|line| !line.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }

    CANDIDATES.iter().copied().find(|&delimiter| {
        let first = count_unquoted(lines[0], delimiter);
        first > 0 && lines.iter().all(|line| count_unquoted(line, delimiter) == first)
    })
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            quoted = !quoted;
        } else if byte == delimiter && !quoted {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_consistent_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n4,5,6\n", false), Some(b','));
        assert_eq!(sniff_delimiter("a;b\n1,5;2\n", false), Some(b';'));
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n", false), Some(b'\t'));
        assert_eq!(sniff_delimiter("a b\n1 2\n", false), Some(b' '));
    }

    #[test]
    fn single_column_has_no_delimiter() {
        assert_eq!(sniff_delimiter("x\n1\n2\n", false), None);
        assert_eq!(sniff_delimiter("name\nJohn Smith\n", false), None);
        assert_eq!(sniff_delimiter("", false), None);
    }

    #[test]
    fn quoted_delimiters_are_ignored() {
        assert_eq!(sniff_delimiter("a,b\n\"x,y\",2\n", false), Some(b','));
    }

    #[test]
    fn truncated_last_line_is_ignored() {
        assert_eq!(sniff_delimiter("a,b\n1,2\n3", true), Some(b','));
    }
}
