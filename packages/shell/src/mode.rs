/// Grammar switches the parser consults while tokenizing.
///
/// The runtime owns the option registry; it pushes the relevant flags into
/// the parser through this value instead of the parser reading global state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserMode {
    /// Recognize a whole word `@name` as an array splice.
    pub parse_at: bool,
}

impl ParserMode {
    pub fn with_parse_at(parse_at: bool) -> Self {
        ParserMode { parse_at }
    }
}
