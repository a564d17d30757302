//! Dispatcher for RegXML.
//!
//! Keys and values are built on an explicit frame stack. Every element must
//! be one the dispatcher knows; anything else aborts the parse.

use super::{attr, Attributes, ElementHandler, Object};
use crate::error::{Error, Result};
use crate::objects::{decode_name, CellObject, RegDataType, RegistryObject, Timestamp};
use tracing::trace;

/// Prefix for names synthesized for keys and values without a name.
pub const NONCE_PREFIX: &str = "__NONCE_";

/// The RegXML elements the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegElement {
    /// `regxml` document wrapper
    Document,
    /// `hive` or `msregistry`: a registry scope
    Registry,
    /// `key` or `node`
    Key,
    /// `value`
    Value,
    /// `mtime` leaf
    Mtime,
    /// `string` leaf inside a multi-string value
    String,
    /// `byte_runs` container
    ByteRuns,
    /// `byte_run`
    ByteRun,
}

impl RegElement {
    /// Classifies an element by local name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "regxml" => RegElement::Document,
            "hive" | "msregistry" => RegElement::Registry,
            "key" | "node" => RegElement::Key,
            "value" => RegElement::Value,
            "mtime" => RegElement::Mtime,
            "string" => RegElement::String,
            "byte_runs" => RegElement::ByteRuns,
            "byte_run" => RegElement::ByteRun,
            _ => return None,
        })
    }
}

#[derive(Debug)]
enum Frame {
    Registry(RegistryObject),
    Cell(CellObject),
}

/// Builds [`CellObject`]s from RegXML element events.
///
/// Cells are emitted when their element closes, so a value is emitted
/// before the key that contains it. Keys are indexed by cellpath in the
/// enclosing registry scope.
#[derive(Debug, Default)]
pub struct RegXmlDispatcher {
    stack: Vec<Frame>,
    /// Text of the open `mtime`/`string` leaf
    pending: Option<String>,
    /// Text of the open `value` when its payload was not an attribute
    value_text: Option<String>,
    /// Whether the open `value` has child elements
    value_children: bool,
    nonce: u64,
    last_registry: Option<RegistryObject>,
}

impl RegXmlDispatcher {
    /// Creates a dispatcher with an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry index of the most recently closed hive.
    pub fn last_registry(&self) -> Option<&RegistryObject> {
        self.last_registry.as_ref()
    }

    fn context(&self) -> String {
        match self.stack.last() {
            Some(Frame::Cell(cell)) => cell.cellpath.clone(),
            Some(Frame::Registry(_)) => "hive".to_string(),
            None => "document".to_string(),
        }
    }

    fn next_nonce(&mut self) -> String {
        let name = format!("{}{}", NONCE_PREFIX, self.nonce);
        self.nonce += 1;
        name
    }

    fn has_scope(&self) -> bool {
        self.stack.iter().any(|f| matches!(f, Frame::Registry(_)))
    }

    fn top_cell(&mut self) -> Option<&mut CellObject> {
        match self.stack.last_mut() {
            Some(Frame::Cell(cell)) => Some(cell),
            _ => None,
        }
    }

    /// Cellpath of the key on top of the stack.
    fn parent_key(&self, element: &str) -> Result<Option<String>> {
        match self.stack.last() {
            Some(Frame::Cell(cell)) if cell.is_key() => Ok(Some(cell.cellpath.clone())),
            Some(Frame::Cell(cell)) => Err(Error::Misplaced {
                element: element.to_string(),
                message: format!("inside value {}", cell.cellpath),
            }),
            _ => Ok(None),
        }
    }

    fn start_key(&mut self, attrs: &[(String, String)]) -> Result<()> {
        if !self.has_scope() {
            return Err(Error::Misplaced {
                element: "key".to_string(),
                message: "no enclosing hive or msregistry element".to_string(),
            });
        }
        let parent = self.parent_key("key")?;
        let root = attr(attrs, "root") == Some("1");

        let basename = match attr(attrs, "name") {
            Some(raw) => decode_name(raw, attr(attrs, "name_encoding"), "name", "key")?,
            None => self.next_nonce(),
        };
        let mut key = CellObject::new_key(basename, parent.as_deref());
        if root != parent.is_none() {
            return Err(Error::RootInvariant {
                cellpath: key.cellpath,
                root,
                parent,
            });
        }
        key.root = root;
        self.stack.push(Frame::Cell(key));
        Ok(())
    }

    fn start_value(&mut self, attrs: &[(String, String)]) -> Result<()> {
        let Some(parent) = self.parent_key("value")? else {
            return Err(Error::Misplaced {
                element: "value".to_string(),
                message: "no enclosing key".to_string(),
            });
        };

        let encoding = attr(attrs, "encoding").or_else(|| attr(attrs, "value_encoding"));
        let data_type = RegDataType::from_regxml(attr(attrs, "type").unwrap_or_default(), encoding);

        let basename = if attr(attrs, "default") == Some("1") {
            "Default".to_string()
        } else {
            let raw = attr(attrs, "name").or_else(|| attr(attrs, "key"));
            let enc = attr(attrs, "name_encoding").or_else(|| attr(attrs, "key_encoding"));
            match raw {
                Some(raw) => decode_name(raw, enc, "name", &parent)?,
                None => self.next_nonce(),
            }
        };

        let mut value = CellObject::new_value(basename, &parent, data_type);
        value.data_encoding = encoding.map(str::to_string);
        match attr(attrs, "value").filter(|v| !v.is_empty()) {
            Some(payload) => {
                value.data = Some(payload.to_string());
                self.value_text = None;
            }
            None => self.value_text = Some(String::new()),
        }
        self.value_children = false;
        self.stack.push(Frame::Cell(value));
        Ok(())
    }

    fn add_byte_run(&mut self, attrs: &[(String, String)]) -> Result<()> {
        let run = super::dfxml::parse_byte_run(attrs)?;
        match self.top_cell() {
            Some(cell) => {
                cell.push_byte_run(run);
                Ok(())
            }
            None => Err(Error::Misplaced {
                element: "byte_run".to_string(),
                message: "no enclosing key or value".to_string(),
            }),
        }
    }

    fn end_cell(&mut self, element: &str) -> Result<Option<Object>> {
        let Some(Frame::Cell(mut cell)) = self.stack.pop() else {
            return Err(Error::Misplaced {
                element: element.to_string(),
                message: "closing tag without an open cell".to_string(),
            });
        };

        if cell.is_key() {
            let registry = self.stack.iter_mut().rev().find_map(|f| match f {
                Frame::Registry(r) => Some(r),
                Frame::Cell(_) => None,
            });
            if let Some(registry) = registry {
                registry.insert(cell.clone())?;
            }
        } else if cell.data.is_none() {
            let text = self.value_text.take().unwrap_or_default();
            // Whitespace around child elements is layout, not payload
            let layout = cell.strings.is_some() || (self.value_children && text.trim().is_empty());
            if !layout && !text.is_empty() {
                cell.data = Some(text);
            }
        }
        self.value_text = None;
        self.value_children = false;

        trace!(cellpath = %cell.cellpath, kind = %cell.kind, "cell");
        Ok(Some(Object::Cell(cell)))
    }

    fn end_leaf(&mut self, element: RegElement, name: &str) -> Result<()> {
        let text = self.pending.take().unwrap_or_default();
        let Some(cell) = self.top_cell() else {
            return Err(Error::Misplaced {
                element: name.to_string(),
                message: "no enclosing key or value".to_string(),
            });
        };
        match element {
            RegElement::Mtime => {
                let ts = Timestamp::parse(text.trim())
                    .map_err(|e| Error::decoding("mtime", text.as_str(), cell.cellpath.as_str(), e))?;
                cell.mtime = Some(ts);
            }
            _ => cell.append_string(text)?,
        }
        Ok(())
    }
}

impl ElementHandler for RegXmlDispatcher {
    fn start(&mut self, name: &str, attrs: Attributes) -> Result<()> {
        let element = RegElement::from_name(name).ok_or_else(|| Error::UnexpectedElement {
            element: name.to_string(),
            context: self.context(),
        })?;

        if self.value_text.is_some()
            && matches!(
                element,
                RegElement::Mtime | RegElement::String | RegElement::ByteRuns | RegElement::ByteRun
            )
        {
            self.value_children = true;
        }

        match element {
            RegElement::Document | RegElement::ByteRuns => {}
            RegElement::Registry => self.stack.push(Frame::Registry(RegistryObject::new())),
            RegElement::Key => self.start_key(&attrs)?,
            RegElement::Value => self.start_value(&attrs)?,
            RegElement::Mtime | RegElement::String => self.pending = Some(String::new()),
            RegElement::ByteRun => self.add_byte_run(&attrs)?,
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(buf) = self.pending.as_mut() {
            buf.push_str(text);
        } else if let Some(buf) = self.value_text.as_mut() {
            buf.push_str(text);
        }
    }

    fn end(&mut self, name: &str) -> Result<Option<Object>> {
        let element = RegElement::from_name(name).ok_or_else(|| Error::UnexpectedElement {
            element: name.to_string(),
            context: self.context(),
        })?;

        match element {
            RegElement::Document | RegElement::ByteRuns | RegElement::ByteRun => Ok(None),
            RegElement::Registry => {
                if let Some(Frame::Registry(registry)) = self.stack.pop() {
                    self.last_registry = Some(registry);
                }
                Ok(None)
            }
            RegElement::Key | RegElement::Value => self.end_cell(name),
            RegElement::Mtime | RegElement::String => {
                self.end_leaf(element, name)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_cells, read_regxml};
    use super::*;
    use crate::objects::{CellData, CellKind};
    use std::io::Cursor;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<hive>
  <key root="1" name="ROOT">
    <mtime>2011-04-26T01:30:00Z</mtime>
    <byte_runs><byte_run file_offset="4128" len="96"/></byte_runs>
    <key name="Software">
      <value name="Count" type="int32" value="12"/>
      <value name="UGF0aA==" name_encoding="base64" type="string">C:\Windows</value>
      <value default="1" name="ignored" type="string" value="x"/>
      <value name="List" type="string-list">
        <string>one</string>
        <string>two</string>
      </value>
      <value name="Blob" type="none" encoding="base64" value="aGk="/>
      <value name="Odd" type="REG_LINK"/>
    </key>
  </key>
</hive>"#;

    #[test]
    fn test_depth_first_emission() {
        let cells = parse_cells(Cursor::new(SAMPLE)).unwrap();
        let paths: Vec<_> = cells.iter().map(|c| c.cellpath.as_str()).collect();
        assert_eq!(
            paths,
            [
                "\\ROOT\\Software\\Count",
                "\\ROOT\\Software\\Path",
                "\\ROOT\\Software\\Default",
                "\\ROOT\\Software\\List",
                "\\ROOT\\Software\\Blob",
                "\\ROOT\\Software\\Odd",
                "\\ROOT\\Software",
                "\\ROOT",
            ]
        );
    }

    #[test]
    fn test_cell_contents() {
        let cells = parse_cells(Cursor::new(SAMPLE)).unwrap();
        let by_name = |name: &str| cells.iter().find(|c| c.basename == name).unwrap();

        let root = by_name("ROOT");
        assert!(root.root);
        assert_eq!(root.kind, CellKind::Key);
        assert_eq!(root.mtime.as_ref().map(|t| t.timestamp()), Some(1303781400));
        assert_eq!(root.byte_runs.as_ref().map(|r| r.len()), Some(1));

        let software = by_name("Software");
        assert!(!software.root);
        assert_eq!(software.parent.as_deref(), Some("\\ROOT"));

        let count = by_name("Count");
        assert_eq!(count.kind, CellKind::Value);
        assert_eq!(count.data_type, Some(RegDataType::Dword));
        assert_eq!(count.data.as_deref(), Some("12"));

        let path = by_name("Path");
        assert_eq!(path.data.as_deref(), Some("C:\\Windows"));

        assert_eq!(by_name("Default").data.as_deref(), Some("x"));

        let list = by_name("List");
        assert_eq!(list.data_type, Some(RegDataType::MultiString));
        assert_eq!(
            list.value().unwrap(),
            Some(CellData::Strings(vec!["one".to_string(), "two".to_string()]))
        );

        let blob = by_name("Blob");
        assert_eq!(blob.data_type, Some(RegDataType::String));
        assert_eq!(blob.data.as_deref(), Some("aGk="));
        assert_eq!(blob.value().unwrap(), Some(CellData::Bytes(b"hi".to_vec())));

        let odd = by_name("Odd");
        assert_eq!(odd.data_type, Some(RegDataType::Other("REG_LINK".to_string())));
        assert!(odd.data.is_none());
    }

    #[test]
    fn test_registry_index() {
        let registry = read_regxml(Cursor::new(SAMPLE), |_| {}).unwrap().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("\\ROOT\\Software").is_some());
        assert!(registry.get("\\ROOT\\Software\\Count").is_none());
    }

    #[test]
    fn test_duplicate_cellpath_stops() {
        let xml = r#"<hive>
  <key root="1" name="ROOT">
    <key name="Dup"/>
    <key name="Dup"/>
    <key name="After"/>
  </key>
</hive>"#;
        let mut seen = Vec::new();
        let err = read_regxml(Cursor::new(xml), |c| seen.push(c.cellpath)).unwrap_err();
        assert!(matches!(err, Error::DuplicateCellpath(ref p) if p == "\\ROOT\\Dup"));
        assert_eq!(seen, ["\\ROOT\\Dup"]);
    }

    #[test]
    fn test_root_invariant() {
        let nested_root = r#"<hive><key root="1" name="A"><key root="1" name="B"/></key></hive>"#;
        let err = parse_cells(Cursor::new(nested_root)).unwrap_err();
        assert!(matches!(
            err,
            Error::RootInvariant { root: true, parent: Some(ref p), .. } if p == "\\A"
        ));

        let orphan = r#"<hive><key name="A"/></hive>"#;
        let err = parse_cells(Cursor::new(orphan)).unwrap_err();
        assert!(matches!(err, Error::RootInvariant { root: false, parent: None, .. }));
    }

    #[test]
    fn test_nonce_names() {
        let xml = r#"<hive><key root="1"><key/></key></hive>"#;
        let cells = parse_cells(Cursor::new(xml)).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].basename, "__NONCE_1");
        assert_eq!(cells[1].basename, "__NONCE_0");
        assert_eq!(cells[0].cellpath, "\\__NONCE_0\\__NONCE_1");
        assert_ne!(cells[0].cellpath, cells[1].cellpath);
    }

    #[test]
    fn test_sibling_nonce_names() {
        let xml = r#"<hive><key root="1" name="R"><key/><key/></key></hive>"#;
        let cells = parse_cells(Cursor::new(xml)).unwrap();
        let paths: Vec<_> = cells.iter().map(|c| c.cellpath.as_str()).collect();
        assert_eq!(paths, ["\\R\\__NONCE_0", "\\R\\__NONCE_1", "\\R"]);
    }

    #[test]
    fn test_text_whitespace_kept() {
        let xml = r#"<hive>
  <key root="1" name="R">
    <value name="v" type="string">  padded  </value>
    <value name="m" type="string-list">
      <string> a </string>
      <string>b </string>
    </value>
    <value name="t" type="string">
      <mtime> 2011-04-26T01:30:00Z </mtime>
    </value>
  </key>
</hive>"#;
        let cells = parse_cells(Cursor::new(xml)).unwrap();
        let by_name = |name: &str| cells.iter().find(|c| c.basename == name).unwrap();

        assert_eq!(by_name("v").data.as_deref(), Some("  padded  "));

        let list = by_name("m");
        assert_eq!(list.strings, Some(vec![" a ".to_string(), "b ".to_string()]));
        assert!(list.data.is_none());

        let timed = by_name("t");
        assert!(timed.data.is_none());
        assert_eq!(timed.mtime.as_ref().map(|t| t.timestamp()), Some(1303781400));
    }

    #[test]
    fn test_structural_errors() {
        let cases = [
            r#"<hive><key root="1" name="A"><subkey/></key></hive>"#,
            r#"<key root="1" name="A"/>"#,
            r#"<hive><value name="v" type="string"/></hive>"#,
            r#"<hive><key root="1" name="A"><value name="v" type="int32"><string>x</string></value></key></hive>"#,
        ];
        for xml in cases {
            let err = parse_cells(Cursor::new(xml)).unwrap_err();
            assert!(err.is_structural(), "{} gave {:?}", xml, err);
        }
    }

    #[test]
    fn test_decoding_errors() {
        let bad_name = r#"<hive><key root="1" name="***" name_encoding="base64"/></hive>"#;
        assert!(matches!(
            parse_cells(Cursor::new(bad_name)),
            Err(Error::Decoding { .. })
        ));

        let bad_mtime = r#"<hive><key root="1" name="A"><mtime>soon</mtime></key></hive>"#;
        assert!(matches!(
            parse_cells(Cursor::new(bad_mtime)),
            Err(Error::Decoding { .. })
        ));
    }

    #[test]
    fn test_msregistry_and_node_aliases() {
        let xml = r#"<regxml><msregistry><node root="1" name="R"><node name="C"/></node></msregistry></regxml>"#;
        let cells = parse_cells(Cursor::new(xml)).unwrap();
        assert_eq!(cells[0].cellpath, "\\R\\C");
        assert!(cells.iter().all(|c| c.is_key()));
    }
}
