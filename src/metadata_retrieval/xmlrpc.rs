//! Minimal XML-RPC codec for the OpenSubtitles API.
//!
//! Only what the hash lookup needs is supported: method calls with scalar,
//! array and struct parameters, and responses carrying a single value or a
//! fault. Unknown scalar types are decoded as strings.
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlRpcError {
    #[error("Invalid XML: {0}")]
    Xml(String),

    #[error("Unexpected XML-RPC structure: {0}")]
    Malformed(String),

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Looks up a struct member; `None` for missing members and non-structs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    /// Scalar rendered as text. OpenSubtitles sends most numbers as strings,
    /// so callers parse from this.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Int(i) => u32::try_from(*i).ok(),
            _ => self.to_text()?.trim().parse().ok(),
        }
    }

    fn encode_into(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::String(s) => {
                out.push_str("<string>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</string>");
            }
            Value::Int(i) => out.push_str(&format!("<int>{}</int>", i)),
            Value::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
            Value::Bool(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
            Value::Array(values) => {
                out.push_str("<array><data>");
                for value in values {
                    value.encode_into(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape(name.as_str()));
                    out.push_str("</name>");
                    value.encode_into(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Serializes a method call document.
pub(crate) fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.encode_into(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Parses a method response, turning a `<fault>` into [`XmlRpcError::Fault`].
///
/// A response without parameters decodes to [`Value::Nil`].
pub(crate) fn decode_response(xml: &str) -> Result<Value, XmlRpcError> {
    let tokens = tokenize(xml)?;
    let mut cursor = Cursor { tokens: &tokens, pos: 0 };

    cursor.expect_open("methodResponse")?;
    let section = match cursor.bump() {
        Some(Token::Open(name)) => name.clone(),
        other => {
            return Err(XmlRpcError::Malformed(format!(
                "expected <params> or <fault>, found {:?}",
                other
            )));
        }
    };

    match section.as_str() {
        "fault" => {
            let fault = cursor.parse_value()?;
            let code = fault
                .get("faultCode")
                .and_then(|c| c.to_text())
                .and_then(|c| c.parse().ok())
                .unwrap_or(0);
            let message = fault
                .get("faultString")
                .and_then(|m| m.to_text())
                .unwrap_or_default();
            Err(XmlRpcError::Fault { code, message })
        }
        "params" => {
            if cursor.eat_close("params") {
                return Ok(Value::Nil);
            }
            cursor.expect_open("param")?;
            let value = cursor.parse_value()?;
            cursor.expect_close("param")?;
            Ok(value)
        }
        other => Err(XmlRpcError::Malformed(format!(
            "expected <params> or <fault>, found <{}>",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut tokens = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                tokens.push(Token::Open(String::from_utf8_lossy(e.name().as_ref()).to_string()));
            }
            Ok(Event::End(ref e)) => {
                tokens.push(Token::Close(String::from_utf8_lossy(e.name().as_ref()).to_string()));
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                tokens.push(Token::Open(name.clone()));
                tokens.push(Token::Close(name));
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|e| XmlRpcError::Xml(e.to_string()))?;
                tokens.push(Token::Text(text.into_owned()));
            }
            Ok(Event::CData(ref e)) => {
                tokens.push(Token::Text(String::from_utf8_lossy(e).to_string()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XmlRpcError::Xml(e.to_string())),
        }
    }

    Ok(tokens)
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn bump(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn eat_close(&mut self, name: &str) -> bool {
        if matches!(self.peek(), Some(Token::Close(n)) if n == name) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<(), XmlRpcError> {
        match self.bump() {
            Some(Token::Open(n)) if n == name => Ok(()),
            other => Err(XmlRpcError::Malformed(format!(
                "expected <{}>, found {:?}",
                name, other
            ))),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), XmlRpcError> {
        match self.bump() {
            Some(Token::Close(n)) if n == name => Ok(()),
            other => Err(XmlRpcError::Malformed(format!(
                "expected </{}>, found {:?}",
                name, other
            ))),
        }
    }

    /// Text content up to the closing tag; empty elements yield "".
    fn text_until_close(&mut self, name: &str) -> Result<String, XmlRpcError> {
        let text = match self.peek() {
            Some(Token::Text(text)) => {
                let text = text.clone();
                self.advance();
                text
            }
            _ => String::new(),
        };
        self.expect_close(name)?;
        Ok(text)
    }

    fn parse_value(&mut self) -> Result<Value, XmlRpcError> {
        self.expect_open("value")?;

        let value = match self.bump().cloned() {
            // Untyped values are strings
            Some(Token::Close(name)) if name == "value" => return Ok(Value::String(String::new())),
            Some(Token::Text(text)) => Value::String(text),
            Some(Token::Open(kind)) => self.parse_typed(&kind)?,
            other => {
                return Err(XmlRpcError::Malformed(format!(
                    "unexpected {:?} in <value>",
                    other
                )));
            }
        };

        self.expect_close("value")?;
        Ok(value)
    }

    fn parse_typed(&mut self, kind: &str) -> Result<Value, XmlRpcError> {
        match kind {
            "int" | "i4" | "i8" => {
                let text = self.text_until_close(kind)?;
                text.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| XmlRpcError::Malformed(format!("invalid integer '{}'", text)))
            }
            "double" => {
                let text = self.text_until_close(kind)?;
                text.trim()
                    .parse()
                    .map(Value::Double)
                    .map_err(|_| XmlRpcError::Malformed(format!("invalid double '{}'", text)))
            }
            "boolean" => {
                let text = self.text_until_close(kind)?;
                match text.trim() {
                    "1" => Ok(Value::Bool(true)),
                    "0" => Ok(Value::Bool(false)),
                    other => Err(XmlRpcError::Malformed(format!("invalid boolean '{}'", other))),
                }
            }
            "nil" => {
                self.expect_close(kind)?;
                Ok(Value::Nil)
            }
            "array" => {
                let mut values = Vec::new();
                if self.eat_close("array") {
                    return Ok(Value::Array(values));
                }
                self.expect_open("data")?;
                while !self.eat_close("data") {
                    values.push(self.parse_value()?);
                }
                self.expect_close("array")?;
                Ok(Value::Array(values))
            }
            "struct" => {
                let mut members = BTreeMap::new();
                while !self.eat_close("struct") {
                    self.expect_open("member")?;
                    self.expect_open("name")?;
                    let name = self.text_until_close("name")?;
                    let value = self.parse_value()?;
                    self.expect_close("member")?;
                    members.insert(name, value);
                }
                Ok(Value::Struct(members))
            }
            // string, base64, dateTime.iso8601 and anything unknown
            _ => self.text_until_close(kind).map(Value::String),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_login_call() {
        let xml = encode_call(
            "LogIn",
            &["".into(), "".into(), "en".into(), "media_detective v0.1.0".into()],
        );
        assert!(xml.starts_with(
            "<?xml version=\"1.0\"?><methodCall><methodName>LogIn</methodName>"
        ));
        assert!(xml.contains("<param><value><string>en</string></value></param>"));
        assert!(xml.contains("<value><string></string></value>"));
        assert!(xml.ends_with("</params></methodCall>"));
    }

    #[test]
    fn test_encode_escapes_and_structs() {
        let mut members = BTreeMap::new();
        members.insert("moviefilename".to_string(), Value::from("Tom & Jerry <1>.avi"));
        members.insert("moviebytesize".to_string(), Value::from("1234"));
        let xml = encode_call("InsertMovieHash", &[Value::Array(vec![Value::Struct(members)])]);

        assert!(xml.contains("Tom &amp; Jerry &lt;1&gt;.avi"));
        assert!(xml.contains(
            "<array><data><value><struct><member><name>moviebytesize</name>"
        ));
    }

    #[test]
    fn test_decode_login_response() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<methodResponse>
  <params>
    <param>
      <value>
        <struct>
          <member><name>token</name><value><string>abc123</string></value></member>
          <member><name>status</name><value><string>200 OK</string></value></member>
          <member><name>seconds</name><value><double>0.005</double></value></member>
        </struct>
      </value>
    </param>
  </params>
</methodResponse>"#;

        let value = decode_response(xml).unwrap();
        assert_eq!(value.get("token").and_then(Value::as_str), Some("abc123"));
        assert_eq!(value.get("status").and_then(Value::as_str), Some("200 OK"));
        assert_eq!(value.get("seconds"), Some(&Value::Double(0.005)));
    }

    #[test]
    fn test_decode_nested_arrays_and_untyped_values() {
        let xml = r#"<methodResponse><params><param><value><struct>
            <member><name>data</name><value><struct>
              <member><name>8e245d9679d31e12</name><value><array><data>
                <value><struct>
                  <member><name>MovieKind</name><value>episode</value></member>
                  <member><name>SeriesSeason</name><value><int>1</int></value></member>
                  <member><name>Empty</name><value></value></member>
                  <member><name>Nothing</name><value><nil/></value></member>
                </struct></value>
              </data></array></value></member>
            </struct></value></member>
            <member><name>empty</name><value><array><data/></array></value></member>
        </struct></value></param></params></methodResponse>"#;

        let value = decode_response(xml).unwrap();
        let candidates = value
            .get("data")
            .and_then(|d| d.get("8e245d9679d31e12"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].get("MovieKind").and_then(Value::as_str), Some("episode"));
        assert_eq!(candidates[0].get("SeriesSeason").and_then(Value::as_u32), Some(1));
        assert_eq!(candidates[0].get("Empty").and_then(Value::as_str), Some(""));
        assert_eq!(candidates[0].get("Nothing"), Some(&Value::Nil));
        assert_eq!(value.get("empty").and_then(Value::as_array).map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_decode_fault() {
        let xml = r#"<methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>401</int></value></member>
            <member><name>faultString</name><value><string>Unauthorized</string></value></member>
        </struct></value></fault></methodResponse>"#;

        match decode_response(xml) {
            Err(XmlRpcError::Fault { code, message }) => {
                assert_eq!(code, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_response("<html><body>502 Bad Gateway</body></html>").is_err());
        let malformed = "<methodResponse><params><param><value><int>x</int></value>\
                         </param></params></methodResponse>";
        assert!(decode_response(malformed).is_err());
    }

    #[test]
    fn test_as_u32_from_string() {
        assert_eq!(Value::from("12").as_u32(), Some(12));
        assert_eq!(Value::from("abc").as_u32(), None);
        assert_eq!(Value::Int(-1).as_u32(), None);
    }
}
