//! Python dictionary literals.
//!
//! Recording headers are written with Python's `str(dict)`, e.g.
//!
//! ```text
//! {'CN_Level': 70.0, 'Trials': 10, 'StimEnable': True, 'GapList': [False, True]}
//! ```
//!
//! [`PyDict::parse`] tokenizes that text (strings, numbers, booleans, `None`,
//! lists, and tuples) and [`PyDict`]'s `Display` writes it back in the same
//! form. Keys keep their insertion order.

use std::fmt;

/// A Python literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    /// `None`
    None,
    /// `True` / `False`
    Bool(bool),
    /// Integer literal, including Python 2 longs (`10L`).
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Single- or double-quoted string.
    Str(String),
    /// List or tuple.
    List(Vec<PyValue>),
}

impl PyValue {
    /// Numeric value of an int, float, or bool.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PyValue::Int(i) => Some(i as f64),
            PyValue::Float(f) => Some(f),
            PyValue::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Integer value; floats with no fractional part are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PyValue::Int(i) => Some(i),
            PyValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(f as i64),
            PyValue::Bool(b) => Some(i64::from(b)),
            _ => None,
        }
    }

    /// Truth value of a bool or number.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PyValue::Bool(b) => Some(b),
            PyValue::Int(i) => Some(i != 0),
            PyValue::Float(f) => Some(f != 0.0),
            _ => None,
        }
    }

    /// String contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// List items.
    pub fn as_list(&self) -> Option<&[PyValue]> {
        match self {
            PyValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<f64> for PyValue {
    fn from(v: f64) -> Self {
        PyValue::Float(v)
    }
}

impl From<i64> for PyValue {
    fn from(v: i64) -> Self {
        PyValue::Int(v)
    }
}

impl From<usize> for PyValue {
    fn from(v: usize) -> Self {
        PyValue::Int(v as i64)
    }
}

impl From<bool> for PyValue {
    fn from(v: bool) -> Self {
        PyValue::Bool(v)
    }
}

impl From<&str> for PyValue {
    fn from(v: &str) -> Self {
        PyValue::Str(v.to_string())
    }
}

impl From<Vec<bool>> for PyValue {
    fn from(v: Vec<bool>) -> Self {
        PyValue::List(v.into_iter().map(PyValue::Bool).collect())
    }
}

impl fmt::Display for PyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyValue::None => f.write_str("None"),
            PyValue::Bool(true) => f.write_str("True"),
            PyValue::Bool(false) => f.write_str("False"),
            PyValue::Int(i) => write!(f, "{i}"),
            PyValue::Float(v) if v.is_nan() => f.write_str("nan"),
            PyValue::Float(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "inf" } else { "-inf" })
            }
            PyValue::Float(v) => write!(f, "{v:?}"),
            PyValue::Str(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("'")
            }
            PyValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// An ordered Python dictionary with string keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PyDict {
    entries: Vec<(String, PyValue)>,
}

impl PyDict {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PyValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&PyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Numeric value under `key`.
    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PyValue::as_f64)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse a dictionary literal. Trailing whitespace is allowed; anything
    /// else after the closing brace is an error.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut p = Parser::new(text);
        p.skip_ws();
        let dict = p.dict()?;
        p.skip_ws();
        if let Some(c) = p.peek() {
            return Err(format!("unexpected '{c}' after dictionary at column {}", p.pos + 1));
        }
        Ok(dict)
    }
}

impl fmt::Display for PyDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {v}", PyValue::Str(k.clone()))?;
        }
        f.write_str("}")
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(format!("expected '{want}', found '{c}' at column {}", self.pos)),
            None => Err(format!("expected '{want}', found end of line")),
        }
    }

    fn dict(&mut self) -> Result<PyDict, String> {
        self.expect('{')?;
        let mut dict = PyDict::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(dict);
            }
            let key = match self.value()? {
                PyValue::Str(s) => s,
                other => return Err(format!("dictionary key must be a string, found {other}")),
            };
            self.expect(':')?;
            let value = self.value()?;
            dict.insert(key, value);

            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(dict),
                Some(c) => return Err(format!("expected ',' or '}}', found '{c}' at column {}", self.pos)),
                None => return Err("unterminated dictionary".to_string()),
            }
        }
    }

    fn sequence(&mut self, close: char) -> Result<PyValue, String> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(PyValue::List(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(c) if c == close => return Ok(PyValue::List(items)),
                Some(c) => return Err(format!("expected ',' or '{close}', found '{c}' at column {}", self.pos)),
                None => return Err("unterminated list".to_string()),
            }
        }
    }

    fn value(&mut self) -> Result<PyValue, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("expected a value, found end of line".to_string()),
            Some('[') => {
                self.pos += 1;
                self.sequence(']')
            }
            Some('(') => {
                self.pos += 1;
                self.sequence(')')
            }
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                self.string(q).map(PyValue::Str)
            }
            // Python 2 unicode literal
            Some('u') if matches!(self.chars.get(self.pos + 1), Some('\'' | '"')) => {
                self.pos += 1;
                self.value()
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(_) => self.word(),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err("unterminated string".to_string()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<PyValue, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let text = raw.strip_suffix(['L', 'l']).unwrap_or(&raw);

        if let Ok(i) = text.parse::<i64>() {
            return Ok(PyValue::Int(i));
        }
        match text.to_ascii_lowercase().as_str() {
            "inf" | "+inf" => return Ok(PyValue::Float(f64::INFINITY)),
            "-inf" => return Ok(PyValue::Float(f64::NEG_INFINITY)),
            "nan" | "-nan" | "+nan" => return Ok(PyValue::Float(f64::NAN)),
            _ => {}
        }
        text.parse::<f64>()
            .map(PyValue::Float)
            .map_err(|_| format!("invalid number '{raw}' at column {}", start + 1))
    }

    fn word(&mut self) -> Result<PyValue, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" => Ok(PyValue::Bool(true)),
            "False" => Ok(PyValue::Bool(false)),
            "None" => Ok(PyValue::None),
            "nan" => Ok(PyValue::Float(f64::NAN)),
            "inf" => Ok(PyValue::Float(f64::INFINITY)),
            "" => Err(format!("unexpected '{}' at column {}", self.peek().unwrap_or(' '), start + 1)),
            other => Err(format!("unknown name '{other}' at column {}", start + 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_python_header() {
        let text = "{'PP_Mode': 0, 'CN_Level': 70.0, 'StimEnable': True, 'PP_MultiFreq': '4000;8000', \
                    'Trials': 10L, 'Analysis_HPF': 5e+01, u'ITI': 20.0} ";
        let d = PyDict::parse(text).unwrap();
        assert_eq!(d.len(), 7);
        assert_eq!(d.get("PP_Mode"), Some(&PyValue::Int(0)));
        assert_eq!(d.f64("CN_Level"), Some(70.0));
        assert_eq!(d.get("StimEnable").and_then(PyValue::as_bool), Some(true));
        assert_eq!(d.get("PP_MultiFreq").and_then(PyValue::as_str), Some("4000;8000"));
        assert_eq!(d.get("Trials").and_then(PyValue::as_i64), Some(10));
        assert_eq!(d.f64("Analysis_HPF"), Some(50.0));
        assert_eq!(d.f64("ITI"), Some(20.0));
    }

    #[test]
    fn parses_gap_list() {
        let d = PyDict::parse("{'GapList': [False, True, True, (1, 2), []]}").unwrap();
        let list = d.get("GapList").and_then(PyValue::as_list).unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list[1], PyValue::Bool(true));
        assert_eq!(list[3], PyValue::List(vec![PyValue::Int(1), PyValue::Int(2)]));
        assert_eq!(list[4], PyValue::List(vec![]));
    }

    #[test]
    fn display_matches_python() {
        let mut d = PyDict::new();
        d.insert("Points", 3usize);
        d.insert("inSampleFreq", 24414.0625);
        d.insert("GapMode", true);
        d.insert("Name", "it's");
        d.insert("GapList", vec![false, true]);
        assert_eq!(
            d.to_string(),
            "{'Points': 3, 'inSampleFreq': 24414.0625, 'GapMode': True, 'Name': 'it\\'s', 'GapList': [False, True]}"
        );
        assert_eq!(PyDict::parse(&d.to_string()).unwrap(), d);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut d = PyDict::new();
        d.insert("a", 1i64);
        d.insert("b", 2i64);
        d.insert("a", 3i64);
        let keys: Vec<_> = d.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(d.get("a"), Some(&PyValue::Int(3)));
    }

    #[test]
    fn errors_name_the_problem() {
        assert!(PyDict::parse("").unwrap_err().contains("expected '{'"));
        assert!(PyDict::parse("{'a': 1").unwrap_err().contains("unterminated"));
        assert!(PyDict::parse("{'a': array([1])}").unwrap_err().contains("unknown name 'array'"));
        assert!(PyDict::parse("{1: 2}").unwrap_err().contains("key must be a string"));
        assert!(PyDict::parse("{'a': 1} x").unwrap_err().contains("after dictionary"));
        assert!(PyDict::parse("{'a': 1.2.3}").unwrap_err().contains("invalid number"));
    }

    #[test]
    fn non_finite_floats() {
        let d = PyDict::parse("{'a': nan, 'b': -inf}").unwrap();
        assert!(d.f64("a").unwrap().is_nan());
        assert_eq!(d.f64("b"), Some(f64::NEG_INFINITY));
    }
}
