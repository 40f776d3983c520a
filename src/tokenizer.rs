/// Splits a command line into words on whitespace.
///
/// Single or double quotes group characters (whitespace included) into one
/// word and are removed. Operators such as `|`, `<` and `>` are only
/// recognized downstream when they stand alone as a word.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars();
    let mut buf = String::new();
    // A quoted empty string is still a word.
    let mut in_word = false;

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                if in_word {
                    tokens.push(std::mem::take(&mut buf));
                    in_word = false;
                }
            }
            '"' | '\'' => {
                in_word = true;
                for nc in chars.by_ref() {
                    if nc == ch {
                        break;
                    }
                    buf.push(nc);
                }
            }
            _ => {
                in_word = true;
                buf.push(ch);
            }
        }
    }

    if in_word {
        tokens.push(buf);
    }

    tokens
}
