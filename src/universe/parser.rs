use std::path::Path;
use thiserror::Error;

use super::SectorUniverse;

/// Exported constant holding the mapping in the TypeScript source
pub const CONSTANT_NAME: &str = "SECTOR_STOCKS";

#[derive(Error, Debug)]
pub enum UniverseError {
    #[error("Could not find the {0} mapping in the sector source")]
    BlockNotFound(String),

    #[error("Sector mapping contains no sectors with symbols")]
    Empty,

    #[error("Syntax error at line {line}, column {column}: expected {expected}, found {found}")]
    Syntax {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    #[error("Failed to read sector mapping {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read and parse the sector mapping file
pub fn load_sector_universe(path: &Path) -> Result<SectorUniverse, UniverseError> {
    let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_sector_universe(&content)
}

/// Parse the `SECTOR_STOCKS` object literal out of a TypeScript source.
///
/// Grammar, after the `=` that follows the constant name:
///
/// ```text
/// object := "{" [ entry { "," entry } [","] ] "}"
/// entry  := (string | ident) ":" list
/// list   := "[" [ string { "," string } [","] ] "]"
/// ```
///
/// Quoted list items made of letters and `&` are symbols; anything else is
/// skipped with a warning.
pub fn parse_sector_universe(source: &str) -> Result<SectorUniverse, UniverseError> {
    let mut parser = Parser::new(source);
    parser.seek_mapping()?;
    let universe = parser.parse_object()?;

    if universe.is_empty() || universe.symbol_count() == 0 {
        return Err(UniverseError::Empty);
    }

    for (symbol, sectors) in universe.shared_symbols() {
        tracing::warn!(
            symbol,
            sectors = ?sectors,
            "Symbol listed under several sectors, classifying under {}",
            sectors[0]
        );
    }

    Ok(universe)
}

fn is_symbol(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().all(|c| c.is_ascii_alphabetic() || c == '&')
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, expected: &str) -> UniverseError {
        let consumed = &self.src[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.len() - consumed.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
        let found = match self.src[self.pos..].chars().next() {
            Some(c) => format!("'{}'", c),
            None => "end of input".to_string(),
        };
        UniverseError::Syntax {
            line,
            column,
            expected: expected.to_string(),
            found,
        }
    }

    fn expect(&mut self, byte: u8, expected: &str) -> Result<(), UniverseError> {
        self.skip_trivia();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    /// Skip whitespace, `//` and `/* */` comments
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() && !self.bytes[self.pos..].starts_with(b"*/") {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                _ => break,
            }
        }
    }

    /// Position the cursor on the `{` that opens the mapping
    fn seek_mapping(&mut self) -> Result<(), UniverseError> {
        let mut from = 0;
        while let Some(found) = self.src[from..].find(CONSTANT_NAME) {
            let start = from + found;
            let end = start + CONSTANT_NAME.len();
            from = end;

            let standalone = (start == 0 || !is_ident_byte(self.bytes[start - 1]))
                && self.bytes.get(end).map_or(true, |b| !is_ident_byte(*b));
            if !standalone {
                continue;
            }

            // Skip an optional type annotation up to the assignment
            let Some(eq) = self.src[end..].find(['=', ';']) else {
                break;
            };
            if self.bytes[end + eq] != b'=' {
                continue;
            }

            self.pos = end + eq + 1;
            self.skip_trivia();
            if self.peek() == Some(b'{') {
                return Ok(());
            }
        }

        Err(UniverseError::BlockNotFound(CONSTANT_NAME.to_string()))
    }

    fn parse_object(&mut self) -> Result<SectorUniverse, UniverseError> {
        let mut universe = SectorUniverse::new();
        self.expect(b'{', "'{'")?;

        loop {
            self.skip_trivia();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                break;
            }

            let sector = self.parse_key()?;
            self.expect(b':', "':' after sector name")?;
            let symbols = self.parse_list(&sector)?;
            universe.insert(&sector, symbols);

            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("',' or '}'")),
            }
        }

        Ok(universe)
    }

    fn parse_key(&mut self) -> Result<String, UniverseError> {
        self.skip_trivia();
        match self.peek() {
            Some(b'\'') | Some(b'"') => self.parse_string(),
            Some(b) if is_ident_byte(b) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_byte) {
                    self.pos += 1;
                }
                Ok(self.src[start..self.pos].to_string())
            }
            _ => Err(self.error("sector name")),
        }
    }

    fn parse_list(&mut self, sector: &str) -> Result<Vec<String>, UniverseError> {
        self.expect(b'[', "'[' opening the symbol list")?;
        let mut symbols = Vec::new();

        loop {
            self.skip_trivia();
            if self.peek() == Some(b']') {
                self.pos += 1;
                break;
            }

            let token = match self.peek() {
                Some(b'\'') | Some(b'"') => self.parse_string()?,
                _ => return Err(self.error("quoted symbol")),
            };
            if is_symbol(&token) {
                symbols.push(token);
            } else {
                tracing::warn!(sector, token = %token, "Skipping entry that is not a ticker symbol");
            }

            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("',' or ']'")),
            }
        }

        Ok(symbols)
    }

    fn parse_string(&mut self) -> Result<String, UniverseError> {
        let Some(quote) = self.peek() else {
            return Err(self.error("quoted string"));
        };
        self.pos += 1;

        let mut value = String::new();
        let mut segment_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("closing quote")),
                Some(b) if b == quote => {
                    value.push_str(&self.src[segment_start..self.pos]);
                    self.pos += 1;
                    return Ok(value);
                }
                Some(b'\\') => {
                    value.push_str(&self.src[segment_start..self.pos]);
                    self.pos += 1;
                    let Some(escaped) = self.src[self.pos..].chars().next() else {
                        return Err(self.error("escaped character"));
                    };
                    value.push(escaped);
                    self.pos += escaped.len_utf8();
                    segment_start = self.pos;
                }
                Some(b'\n') => return Err(self.error("closing quote")),
                Some(_) => self.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_single_line_mapping() {
        let universe = parse_sector_universe(
            "export const SECTOR_STOCKS = { 'Banking': ['HDFC','ICICI'], 'IT': ['TCS'] }",
        )
        .unwrap();

        let sectors: Vec<(&str, &[String])> = universe.sectors().collect();
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0], ("Banking", &symbols(&["HDFC", "ICICI"])[..]));
        assert_eq!(sectors[1], ("IT", &symbols(&["TCS"])[..]));
    }

    #[test]
    fn test_parse_typescript_module() {
        let source = r#"
// Sector to stock mapping used by the breakout scanner
export const SECTOR_NAMES = ['Banking', 'Automobile'];

export const SECTOR_STOCKS: Record<string, string[]> = {
  'Banking': [
    'HDFCBANK', 'ICICIBANK', // private
    "SBIN",
  ],
  /* autos */
  'Automobile': ['M&M', 'MARUTI', 'TATAMOTORS'],
  "Oil & Gas": ['RELIANCE', 'ONGC'],
};

export default SECTOR_STOCKS;
"#;
        let universe = parse_sector_universe(source).unwrap();

        assert_eq!(universe.len(), 3);
        assert_eq!(
            universe.get("Banking"),
            Some(&symbols(&["HDFCBANK", "ICICIBANK", "SBIN"])[..])
        );
        assert_eq!(
            universe.get("Automobile"),
            Some(&symbols(&["M&M", "MARUTI", "TATAMOTORS"])[..])
        );
        assert_eq!(universe.sector_of("ONGC"), Some("Oil & Gas"));
    }

    #[test]
    fn test_non_symbol_tokens_are_skipped() {
        let universe = parse_sector_universe(
            "export const SECTOR_STOCKS = { 'Auto': ['BAJAJ-AUTO', 'EICHERMOT', '3MINDIA', ''] }",
        )
        .unwrap();
        assert_eq!(universe.get("Auto"), Some(&symbols(&["EICHERMOT"])[..]));
    }

    #[test]
    fn test_unquoted_keys() {
        let universe =
            parse_sector_universe("export const SECTOR_STOCKS = { Pharma: ['SUNPHARMA', 'CIPLA'] }")
                .unwrap();
        assert_eq!(universe.sector_of("CIPLA"), Some("Pharma"));
    }

    #[test]
    fn test_missing_constant() {
        let err = parse_sector_universe("export const INDICES = { 'NIFTY': ['X'] }").unwrap_err();
        assert!(matches!(err, UniverseError::BlockNotFound(_)));

        // Mentioned only in a comment
        let err = parse_sector_universe("// see SECTOR_STOCKS_V2;\nconst x = 1;").unwrap_err();
        assert!(matches!(err, UniverseError::BlockNotFound(_)));
    }

    #[test]
    fn test_reference_without_assignment_is_skipped() {
        let source = "import { SECTOR_STOCKS } from './old';\nexport const SECTOR_STOCKS = { 'IT': ['TCS'] }";
        let universe = parse_sector_universe(source).unwrap();
        assert_eq!(universe.symbols(), vec!["TCS"]);
    }

    #[test]
    fn test_empty_mapping() {
        let err = parse_sector_universe("export const SECTOR_STOCKS = {}").unwrap_err();
        assert!(matches!(err, UniverseError::Empty));

        let err = parse_sector_universe("export const SECTOR_STOCKS = { 'IT': [] }").unwrap_err();
        assert!(matches!(err, UniverseError::Empty));
    }

    #[test]
    fn test_malformed_list_reports_position() {
        let source = "export const SECTOR_STOCKS = {\n  'IT': ['TCS' 'INFY']\n}";
        match parse_sector_universe(source).unwrap_err() {
            UniverseError::Syntax {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, "',' or ']'");
                assert_eq!(found, "'''");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_sector_universe("export const SECTOR_STOCKS = { 'IT': ['TCS").unwrap_err();
        match err {
            UniverseError::Syntax { expected, found, .. } => {
                assert_eq!(expected, "closing quote");
                assert_eq!(found, "end of input");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_sector_universe(Path::new("/nonexistent/sector-stocks-mapping.ts")).unwrap_err();
        assert!(matches!(err, UniverseError::Io { .. }));
    }
}
