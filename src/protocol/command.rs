//! Command grammar for the client side of the wire.
//!
//! Commands travel as a single newline-terminated ASCII line with
//! whitespace-separated tokens. The verb is case-insensitive. `GET` time
//! tokens are kept as raw strings here; numeric validation happens in the
//! request validator, after the catalog lookup, so that rejection messages
//! keep their contractual order.

/// One client command, parsed from a line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Get {
        filename: String,
        start: String,
        end: String,
    },
    Unknown { raw: String },
    Malformed { reason: String },
}

pub const GET_USAGE: &str = "invalid GET command, usage: GET <filename> <start> <end>";

impl Command {
    pub fn parse(line: &str) -> Command {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let Some(verb) = parts.first() else {
            return Command::Malformed {
                reason: "empty command".to_string(),
            };
        };

        match verb.to_ascii_uppercase().as_str() {
            "LIST" => {
                if parts.len() != 1 {
                    return Command::Malformed {
                        reason: "LIST takes no parameters".to_string(),
                    };
                }
                Command::List
            }
            "GET" => {
                if parts.len() != 4 {
                    return Command::Malformed {
                        reason: GET_USAGE.to_string(),
                    };
                }
                Command::Get {
                    filename: parts[1].to_string(),
                    start: parts[2].to_string(),
                    end: parts[3].to_string(),
                }
            }
            _ => Command::Unknown {
                raw: verb.to_string(),
            },
        }
    }
}

/// Wire form of `LIST`.
pub fn encode_list() -> String {
    "LIST\n".to_string()
}

/// Wire form of `GET`. Time tokens are passed through verbatim; the server
/// owns their validation.
pub fn encode_get(filename: &str, start: &str, end: &str) -> String {
    format!("GET {} {} {}\n", filename, start, end)
}
