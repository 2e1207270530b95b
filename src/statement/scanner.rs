#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
    LineComment,
    BlockComment,
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Count `?` placeholders outside literals, quoted identifiers and comments.
///
/// A lightweight state machine; dialect-specific quoting (e.g. Postgres
/// dollar quotes) is not recognised.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut count = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::BacktickQuoted,
                b'?' => count += 1,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment;
                    idx += 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::BacktickQuoted => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            // SQLite block comments do not nest: the first `*/` ends one.
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    count
}
