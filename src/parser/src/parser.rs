
use {
    std::{error, result, fmt::{self, Display}, io, ops::Deref, rc::Rc},
    fxhash::FxHashMap,
    batcirc_core::{Circuit, GateId, Kind},
};

/// Error messages
#[derive(Debug)]
pub struct Error(String);

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.0, fmt)
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Box<dyn error::Error>>;

fn mk_err(s: String) -> Box<dyn error::Error> {
    Box::new(Error(s))
}

// parser's buffer size
const BUF_SIZE : usize = 1_024 * 16;

// the tokens of the BC language
#[derive(Debug,Clone,PartialEq)]
enum Token {
    Ident(String),
    Num(u32),
    Define,   // :=
    EquivOp,  // ==
    ImplyOp,  // =>
    OrOp,     // |
    AndOp,    // &
    XorOp,    // ^
    NotOp,    // ~
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Eof,
}

impl Token {
    fn show(&self) -> String {
        match self {
            Token::Ident(s) => format!("'{}'", s),
            Token::Num(n) => format!("'{}'", n),
            Token::Define => "':='".to_string(),
            Token::EquivOp => "'=='".to_string(),
            Token::ImplyOp => "'=>'".to_string(),
            Token::OrOp => "'|'".to_string(),
            Token::AndOp => "'&'".to_string(),
            Token::XorOp => "'^'".to_string(),
            Token::NotOp => "'~'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Semi => "';'".to_string(),
            Token::Eof => "end of file".to_string(),
        }
    }
}

const RESERVED : &[&str] =
    &["ASSIGN", "ITE", "OR", "AND", "ODD", "EVEN", "EQUIV", "NOT", "IMPLY", "T", "F"];

struct ParserIO<R: io::Read> {
    r: R, // underlying reader
    eof: bool,
    buf: [u8; BUF_SIZE], // internal buffer
    i: usize, // offset in buf
    len: usize, // current size of buf
    line: u32,
    col: u32,
}

impl<R: io::Read> ParserIO<R> {
    // refill internal buffer
    fn refill(&mut self) -> Result<()> {
        trace!("refill internal buffer (size {})", BUF_SIZE);
        debug_assert!(self.i >= self.len);
        self.i = 0;
        self.len = self.r.read(&mut self.buf)?;
        if self.len == 0 {
            self.eof = true;
        }
        Ok(())
    }

    fn err_with<T>(&self, s: impl Deref<Target=str>) -> Result<T> {
        let s: &str = &*s;
        Err(mk_err(format!("{} (line {}, col {})", s, self.line, self.col)))
    }

    fn err_eof<T>(&self) -> Result<T> {
        self.err_with("unexpected end-of-file")
    }

    // get current char, or EOF
    fn try_get(&mut self) -> Result<Option<u8>> {
        if self.eof {
            Ok(None)
        } else if self.i < self.len {
            Ok(Some(self.buf[self.i]))
        } else {
            self.refill()?;
            debug_assert_eq!(self.i, 0);
            Ok(if self.eof { None } else { Some(self.buf[0]) })
        }
    }

    // get current char, or fail
    fn get(&mut self) -> Result<u8> {
        match self.try_get()? {
            Some(c) => Ok(c),
            None => self.err_eof(),
        }
    }

    // discard current char (must be valid!)
    fn junk(&mut self) {
        if self.buf[self.i] == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        self.i += 1;
    }

    // skip chars until EOL is reached
    fn skip_to_eol(&mut self) -> Result<()> {
        while let Some(c) = self.try_get()? {
            if c == b'\n' { break }
            self.junk();
        }
        Ok(())
    }

    // skip whitespace and `//` comments
    fn skip_spaces(&mut self) -> Result<()> {
        while let Some(c) = self.try_get()? {
            match c {
                b' ' | b'\n' | b'\t' | b'\r' => self.junk(),
                b'/' => {
                    self.junk();
                    let c2 = self.get()?;
                    if c2 != b'/' {
                        return self.err_with("expected '//' to start a comment");
                    }
                    self.skip_to_eol()?;
                }
                _ => break,
            }
        }
        Ok(())
    }
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || c == b'_' || c == b'.' || c == b'@' || c == b'\'' || c == b'$'
}

// entry for a named gate; `defined` is set by its `:=` statement
struct NameEntry {
    gate: GateId,
    defined: bool,
}

struct Parser<R: io::Read> {
    io: ParserIO<R>,
    circ: Circuit,
    names: FxHashMap<Rc<str>, NameEntry>,
    tok: Token,
    true_gate: Option<GateId>,
    false_gate: Option<GateId>,
}

impl<R: io::Read> Parser<R> {
    fn new(r: R) -> Self {
        Parser {
            io: ParserIO {
                r, eof: false, buf: [0; BUF_SIZE], len: 0,
                i: 0, line: 1, col: 1,
            },
            circ: Circuit::new(),
            names: FxHashMap::default(),
            tok: Token::Eof,
            true_gate: None,
            false_gate: None,
        }
    }

    // read the next token into `self.tok`
    fn bump(&mut self) -> Result<()> {
        self.io.skip_spaces()?;
        let c = match self.io.try_get()? {
            None => {
                self.tok = Token::Eof;
                return Ok(());
            }
            Some(c) => c,
        };
        self.tok = match c {
            b'(' => { self.io.junk(); Token::LParen }
            b')' => { self.io.junk(); Token::RParen }
            b'[' => { self.io.junk(); Token::LBracket }
            b']' => { self.io.junk(); Token::RBracket }
            b',' => { self.io.junk(); Token::Comma }
            b';' => { self.io.junk(); Token::Semi }
            b'|' => { self.io.junk(); Token::OrOp }
            b'&' => { self.io.junk(); Token::AndOp }
            b'^' => { self.io.junk(); Token::XorOp }
            b'~' => { self.io.junk(); Token::NotOp }
            b':' => {
                self.io.junk();
                if self.io.get()? != b'=' {
                    return self.io.err_with("expected ':='");
                }
                self.io.junk();
                Token::Define
            }
            b'=' => {
                self.io.junk();
                match self.io.get()? {
                    b'=' => { self.io.junk(); Token::EquivOp }
                    b'>' => { self.io.junk(); Token::ImplyOp }
                    c2 => {
                        return self.io.err_with(
                            format!("expected '==' or '=>', got '={}'", c2 as char));
                    }
                }
            }
            b'"' => {
                // quoted identifier, no escapes
                self.io.junk();
                let mut s = Vec::new();
                loop {
                    let c = self.io.get()?;
                    self.io.junk();
                    if c == b'"' { break }
                    s.push(c);
                }
                Token::Ident(String::from_utf8(s)?)
            }
            c if c.is_ascii_digit() => {
                let mut n: u32 = 0;
                while let Some(c) = self.io.try_get()? {
                    if !c.is_ascii_digit() { break }
                    n = n.checked_mul(10)
                        .and_then(|n| n.checked_add((c - b'0') as u32))
                        .ok_or_else(|| mk_err("integer constant too large".to_string()))?;
                    self.io.junk();
                }
                Token::Num(n)
            }
            c if is_ident_char(c) => {
                let mut s = Vec::new();
                while let Some(c) = self.io.try_get()? {
                    if !is_ident_char(c) { break }
                    s.push(c);
                    self.io.junk();
                }
                Token::Ident(String::from_utf8(s)?)
            }
            c => {
                return self.io.err_with(format!("illegal character '{}'", c as char));
            }
        };
        Ok(())
    }

    fn expect(&mut self, t: Token) -> Result<()> {
        if self.tok != t {
            return self.io.err_with(
                format!("expected {}, got {}", t.show(), self.tok.show()));
        }
        self.bump()
    }

    // the `BC1.0` header line; read before the token stream starts
    fn header(&mut self) -> Result<()> {
        self.io.skip_spaces()?;
        for &c in b"BC".iter() {
            if self.io.get()? != c {
                return self.io.err_with("malformed header, expected 'BC<major>.<minor>'");
            }
            self.io.junk();
        }
        let mut version = Vec::new();
        while let Some(c) = self.io.try_get()? {
            if c.is_ascii_digit() || c == b'.' {
                version.push(c);
                self.io.junk();
            } else {
                break;
            }
        }
        if &version[..] != b"1.0" {
            return self.io.err_with(
                format!("unsupported version 'BC{}', only BC1.0 is accepted",
                        String::from_utf8_lossy(&version)));
        }
        Ok(())
    }

    // the gate a name stands for, installing a placeholder on first sight
    fn name_ref(&mut self, name: String) -> GateId {
        let key: Rc<str> = Rc::from(&name[..]);
        match self.names.get(&key) {
            Some(e) => e.gate,
            None => {
                let g = self.circ.new_undef();
                self.circ.add_name(g, key.clone());
                self.names.insert(key, NameEntry { gate: g, defined: false });
                g
            }
        }
    }

    fn constant_true(&mut self) -> GateId {
        match self.true_gate {
            Some(g) => g,
            None => {
                let g = self.circ.new_true();
                self.true_gate = Some(g);
                g
            }
        }
    }

    fn constant_false(&mut self) -> GateId {
        match self.false_gate {
            Some(g) => g,
            None => {
                let g = self.circ.new_false();
                self.false_gate = Some(g);
                g
            }
        }
    }

    // formula := equiv-chain over imply
    fn formula(&mut self) -> Result<GateId> {
        let first = self.imply()?;
        if self.tok != Token::EquivOp {
            return Ok(first);
        }
        let mut ts = vec![first];
        while self.tok == Token::EquivOp {
            self.bump()?;
            ts.push(self.imply()?);
        }
        Ok(self.circ.new_nary(Kind::Equiv, &ts))
    }

    // imply := or [ '=>' imply ]   (right associative)
    fn imply(&mut self) -> Result<GateId> {
        let a = self.or()?;
        if self.tok != Token::ImplyOp {
            return Ok(a);
        }
        self.bump()?;
        let b = self.imply()?;
        // a => b is OR(~a, b)
        let na = self.circ.new_not(a);
        Ok(self.circ.new_or(&[na, b]))
    }

    fn or(&mut self) -> Result<GateId> {
        let first = self.and()?;
        if self.tok != Token::OrOp {
            return Ok(first);
        }
        let mut ts = vec![first];
        while self.tok == Token::OrOp {
            self.bump()?;
            ts.push(self.and()?);
        }
        Ok(self.circ.new_or(&ts))
    }

    fn and(&mut self) -> Result<GateId> {
        let first = self.xor()?;
        if self.tok != Token::AndOp {
            return Ok(first);
        }
        let mut ts = vec![first];
        while self.tok == Token::AndOp {
            self.bump()?;
            ts.push(self.xor()?);
        }
        Ok(self.circ.new_and(&ts))
    }

    fn xor(&mut self) -> Result<GateId> {
        let first = self.unary()?;
        if self.tok != Token::XorOp {
            return Ok(first);
        }
        let mut ts = vec![first];
        while self.tok == Token::XorOp {
            self.bump()?;
            ts.push(self.unary()?);
        }
        Ok(self.circ.new_nary(Kind::Odd, &ts))
    }

    fn unary(&mut self) -> Result<GateId> {
        if self.tok == Token::NotOp {
            self.bump()?;
            let g = self.unary()?;
            return Ok(self.circ.new_not(g));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<GateId> {
        match self.tok.clone() {
            Token::LParen => {
                self.bump()?;
                let g = self.formula()?;
                self.expect(Token::RParen)?;
                Ok(g)
            }
            Token::LBracket => {
                // [l,u](...) is THRESHOLD, [l,](...) is ATLEAST
                self.bump()?;
                let lo = self.num()?;
                self.expect(Token::Comma)?;
                let hi = match self.tok {
                    Token::Num(n) => { self.bump()?; Some(n) }
                    _ => None,
                };
                self.expect(Token::RBracket)?;
                self.expect(Token::LParen)?;
                let args = self.args()?;
                self.expect(Token::RParen)?;
                match hi {
                    Some(hi) => Ok(self.circ.new_threshold(lo, hi, &args)),
                    None => Ok(self.circ.new_atleast(lo, &args)),
                }
            }
            Token::Ident(word) => {
                match &word[..] {
                    "T" => { self.bump()?; Ok(self.constant_true()) }
                    "F" => { self.bump()?; Ok(self.constant_false()) }
                    "ITE" => {
                        self.bump()?;
                        self.expect(Token::LParen)?;
                        let i = self.formula()?;
                        self.expect(Token::Comma)?;
                        let t = self.formula()?;
                        self.expect(Token::Comma)?;
                        let e = self.formula()?;
                        self.expect(Token::RParen)?;
                        Ok(self.circ.new_ite(i, t, e))
                    }
                    "NOT" => {
                        self.bump()?;
                        self.expect(Token::LParen)?;
                        let g = self.formula()?;
                        self.expect(Token::RParen)?;
                        Ok(self.circ.new_not(g))
                    }
                    "IMPLY" => {
                        self.bump()?;
                        self.expect(Token::LParen)?;
                        let a = self.formula()?;
                        self.expect(Token::Comma)?;
                        let b = self.formula()?;
                        self.expect(Token::RParen)?;
                        let na = self.circ.new_not(a);
                        Ok(self.circ.new_or(&[na, b]))
                    }
                    "OR" | "AND" | "ODD" | "EVEN" | "EQUIV" => {
                        let kind = match &word[..] {
                            "OR" => Kind::Or,
                            "AND" => Kind::And,
                            "ODD" => Kind::Odd,
                            "EVEN" => Kind::Even,
                            _ => Kind::Equiv,
                        };
                        self.bump()?;
                        self.expect(Token::LParen)?;
                        let args = self.args()?;
                        self.expect(Token::RParen)?;
                        Ok(self.circ.new_nary(kind, &args))
                    }
                    "ASSIGN" => {
                        self.io.err_with("'ASSIGN' is not a formula")
                    }
                    _ => {
                        self.bump()?;
                        Ok(self.name_ref(word))
                    }
                }
            }
            Token::Num(_) => {
                self.io.err_with("unexpected integer constant")
            }
            t => {
                self.io.err_with(format!("unexpected {}", t.show()))
            }
        }
    }

    fn num(&mut self) -> Result<u32> {
        match self.tok {
            Token::Num(n) => {
                self.bump()?;
                Ok(n)
            }
            ref t => self.io.err_with(format!("expected a number, got {}", t.show())),
        }
    }

    fn args(&mut self) -> Result<Vec<GateId>> {
        let mut v = vec![self.formula()?];
        while self.tok == Token::Comma {
            self.bump()?;
            v.push(self.formula()?);
        }
        Ok(v)
    }

    // `name := formula ;` or `ASSIGN formula, ..., formula ;`
    fn statement(&mut self) -> Result<()> {
        let word = match self.tok.clone() {
            Token::Ident(w) => w,
            t => {
                return self.io.err_with(
                    format!("expected a definition or ASSIGN, got {}", t.show()));
            }
        };
        if word == "ASSIGN" {
            self.bump()?;
            loop {
                // a top-level negation sends the operand's child to the
                // false queue
                let mark = self.circ.n_slots() as u32;
                let g = self.formula()?;
                if self.circ.gate(g).kind() == Kind::Not && g.index() >= mark {
                    let child = self.circ.first_child(g);
                    self.circ.assigned_to_false.push_back(child);
                } else {
                    self.circ.assigned_to_true.push_back(g);
                }
                if self.tok != Token::Comma {
                    break;
                }
                self.bump()?;
            }
            self.expect(Token::Semi)?;
            return Ok(());
        }
        if RESERVED.contains(&&word[..]) {
            return self.io.err_with(format!("'{}' is a reserved word", word));
        }
        self.bump()?;
        self.expect(Token::Define)?;
        let f = self.formula()?;
        self.expect(Token::Semi)?;

        let key: Rc<str> = Rc::from(&word[..]);
        match self.names.get_mut(&key) {
            Some(e) => {
                if e.defined {
                    return self.io.err_with(format!("'{}' is defined twice", word));
                }
                e.defined = true;
                let g = e.gate;
                self.circ.define_undef(g, Kind::Ref, &[f], 0, 0);
            }
            None => {
                self.circ.add_name(f, key.clone());
                self.names.insert(key, NameEntry { gate: f, defined: true });
            }
        }
        debug!("parsed definition of '{}'", word);
        Ok(())
    }

    fn file(mut self) -> Result<Circuit> {
        self.header()?;
        self.bump()?;
        while self.tok != Token::Eof {
            self.statement()?;
        }
        // names that were never defined are free inputs
        for (_, e) in self.names.iter() {
            if !e.defined {
                self.circ.define_undef(e.gate, Kind::Var, &[], 0, 0);
            }
        }
        let mut circ = self.circ;
        if let Some(cycle) = circ.test_acyclicity() {
            return Err(mk_err(
                format!("cyclic definition through {}", cycle.join(" -> "))));
        }
        Ok(circ)
    }
}

/// Parse a BC1.0 circuit from `r`.
pub fn parse<R: io::Read>(r: R) -> Result<Circuit> {
    let p = Parser::new(r);
    p.file()
}

/// Parse from the given string.
pub fn parse_str(s: &str) -> Result<Circuit> {
    let c = io::Cursor::new(s.as_bytes());
    parse(c)
}

/// Parse from stdin.
pub fn parse_stdin() -> Result<Circuit> {
    let r = io::BufReader::new(io::stdin());
    parse(r)
}

#[cfg(test)]
mod test {
    use super::*;

    fn named(circ: &Circuit, name: &str) -> GateId {
        circ.iter()
            .find(|&(_, g)| g.names().any(|n| n == name))
            .map(|(g, _)| g)
            .expect("no gate with that name")
    }

    #[test]
    fn test_header() {
        assert!(parse_str("BC1.0\n").is_ok());
        let e = parse_str("BC1.1\nASSIGN x;\n").unwrap_err();
        assert!(e.to_string().contains("BC1.0"));
        assert!(parse_str("CNF1.0\n").is_err());
    }

    #[test]
    fn test_simple_definition() {
        let circ = parse_str("BC1.0\ng := AND(a, b);\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::And);
        assert_eq!(circ.count_children(g), 2);
        assert_eq!(circ.gate(named(&circ, "a")).kind(), Kind::Var);
        assert_eq!(circ.assigned_to_true.len(), 1);
        assert_eq!(circ.assigned_to_true[0], g);
    }

    #[test]
    fn test_operand_order() {
        let circ = parse_str("BC1.0\ng := ITE(a, b, c);\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        let (i, t, e) = circ.ite_children(g);
        assert_eq!(i, named(&circ, "a"));
        assert_eq!(t, named(&circ, "b"));
        assert_eq!(e, named(&circ, "c"));
    }

    #[test]
    fn test_precedence() {
        // ~ binds tighter than ^ than & than | than => than ==
        let circ = parse_str("BC1.0\ng := a & b | c;\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::Or);
        let kinds: Vec<Kind> = circ.children(g)
            .map(|c| circ.gate(c).kind())
            .collect();
        assert_eq!(kinds, vec![Kind::And, Kind::Var]);

        let circ = parse_str("BC1.0\ng := ~a ^ b;\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::Odd);
        let kinds: Vec<Kind> = circ.children(g)
            .map(|c| circ.gate(c).kind())
            .collect();
        assert_eq!(kinds, vec![Kind::Not, Kind::Var]);
    }

    #[test]
    fn test_nary_chains() {
        let circ = parse_str("BC1.0\ng := a == b == c;\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::Equiv);
        assert_eq!(circ.count_children(g), 3);

        let circ = parse_str("BC1.0\ng := a ^ b ^ c ^ d;\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::Odd);
        assert_eq!(circ.count_children(g), 4);
    }

    #[test]
    fn test_imply_desugars() {
        // a => b is OR(~a, b)
        let circ = parse_str("BC1.0\ng := a => b;\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::Or);
        let kinds: Vec<Kind> = circ.children(g)
            .map(|c| circ.gate(c).kind())
            .collect();
        assert_eq!(kinds, vec![Kind::Not, Kind::Var]);
    }

    #[test]
    fn test_cardinality_brackets() {
        let circ = parse_str("BC1.0\ng := [1,2](a, b, c);\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::Threshold);
        assert_eq!(circ.gate(g).bounds(), (1, 2));

        let circ = parse_str("BC1.0\ng := [2,](a, b, c);\nASSIGN g;\n").unwrap();
        let g = named(&circ, "g");
        assert_eq!(circ.gate(g).kind(), Kind::Atleast);
        assert_eq!(circ.gate(g).bounds().0, 2);
    }

    #[test]
    fn test_constants_and_negated_assign() {
        let circ = parse_str("BC1.0\ng := ITE(c, T, F);\nASSIGN g, ~h;\n").unwrap();
        assert_eq!(circ.assigned_to_true.len(), 1);
        // ~h queues h itself on the false side
        assert_eq!(circ.assigned_to_false.len(), 1);
        let h = circ.assigned_to_false[0];
        assert_eq!(circ.gate(h).kind(), Kind::Var);
        assert!(circ.gate(h).names().any(|n| n == "h"));
    }

    #[test]
    fn test_forward_reference() {
        let circ = parse_str("BC1.0\ng := AND(h, a);\nh := OR(a, b);\nASSIGN g;\n").unwrap();
        let h = named(&circ, "h");
        // the placeholder became a REF to the defining formula
        assert_eq!(circ.gate(h).kind(), Kind::Ref);
    }

    #[test]
    fn test_quoted_identifiers_and_comments() {
        let circ = parse_str(
            "BC1.0\n// a comment\n\"odd name\" := AND(a, b); // trailing\nASSIGN \"odd name\";\n"
        ).unwrap();
        let g = named(&circ, "odd name");
        assert_eq!(circ.gate(g).kind(), Kind::And);
    }

    #[test]
    fn test_redefinition_rejected() {
        let e = parse_str("BC1.0\ng := AND(a, b);\ng := OR(a, b);\nASSIGN g;\n").unwrap_err();
        assert!(e.to_string().contains("defined twice"));
    }

    #[test]
    fn test_reserved_word_rejected() {
        assert!(parse_str("BC1.0\nOR := AND(a, b);\n").is_err());
    }

    #[test]
    fn test_cyclic_definition_rejected() {
        let e = parse_str("BC1.0\na := NOT(b);\nb := NOT(a);\nASSIGN a;\n").unwrap_err();
        assert!(e.to_string().contains("cyclic"));
    }

    #[test]
    fn test_error_carries_position() {
        let e = parse_str("BC1.0\ng := AND(a,\n%);\n").unwrap_err();
        assert!(e.to_string().contains("line 3"));
    }

    #[test]
    fn test_eof_in_definition() {
        assert!(parse_str("BC1.0\ng := AND(a,").is_err());
    }
}
