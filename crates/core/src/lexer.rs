//! Shell-style word splitting for the options part of a line.
//!
//! POSIX rules: whitespace separates words, single quotes are literal,
//! double quotes honour `\"`, `\\`, `\$` and `` \` ``, and a backslash
//! outside quotes escapes the next character.

pub fn split_words(src: &str) -> Result<Vec<String>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut words = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        if chars[pos].is_whitespace() {
            pos += 1;
            continue;
        }

        let mut word = String::new();
        while pos < chars.len() && !chars[pos].is_whitespace() {
            let c = chars[pos];
            match c {
                '\'' => {
                    pos += 1;
                    loop {
                        if pos >= chars.len() {
                            return Err("No closing quotation".to_owned());
                        }
                        if chars[pos] == '\'' {
                            pos += 1;
                            break;
                        }
                        word.push(chars[pos]);
                        pos += 1;
                    }
                }
                '"' => {
                    pos += 1;
                    loop {
                        if pos >= chars.len() {
                            return Err("No closing quotation".to_owned());
                        }
                        let qc = chars[pos];
                        if qc == '"' {
                            pos += 1;
                            break;
                        }
                        if qc == '\\'
                            && pos + 1 < chars.len()
                            && matches!(chars[pos + 1], '"' | '\\' | '$' | '`')
                        {
                            word.push(chars[pos + 1]);
                            pos += 2;
                            continue;
                        }
                        word.push(qc);
                        pos += 1;
                    }
                }
                '\\' => {
                    pos += 1;
                    if pos >= chars.len() {
                        return Err("No escaped character".to_owned());
                    }
                    word.push(chars[pos]);
                    pos += 1;
                }
                other => {
                    word.push(other);
                    pos += 1;
                }
            }
        }
        words.push(word);
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            split_words("--index-url  url --pre").unwrap(),
            vec!["--index-url", "url", "--pre"]
        );
    }

    #[test]
    fn quotes_are_removed() {
        assert_eq!(split_words("-i 'url'").unwrap(), vec!["-i", "url"]);
        assert_eq!(
            split_words("--global-option=\"yo3\" --global-option \"yo4\"").unwrap(),
            vec!["--global-option=yo3", "--global-option", "yo4"]
        );
        assert_eq!(
            split_words("--install-option='--prefix=/opt dir'").unwrap(),
            vec!["--install-option=--prefix=/opt dir"]
        );
    }

    #[test]
    fn escapes_inside_and_outside_quotes() {
        assert_eq!(split_words(r#"a\ b "c\"d" 'e\f'"#).unwrap(), vec!["a b", "c\"d", "e\\f"]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert_eq!(
            split_words("--hash='sha256:abc").unwrap_err(),
            "No closing quotation"
        );
    }

    #[test]
    fn empty_input_has_no_words() {
        assert!(split_words("   ").unwrap().is_empty());
    }
}
