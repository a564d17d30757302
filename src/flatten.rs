//! Flattening of nested RegXML hives into a single cell list.

use crate::error::Result;
use crate::objects::{HiveObject, RegXMLObject};
use crate::reader::read_regxml;
use std::io::BufRead;
use tracing::debug;

/// Reads every cell of one RegXML input into a [`HiveObject`] named
/// `filename`, in emission order.
pub fn flatten_hive<R: BufRead>(reader: R, filename: &str) -> Result<HiveObject> {
    let mut hive = HiveObject::new(filename);
    read_regxml(reader, |cell| hive.cells.push(cell))?;
    debug!(filename, cells = hive.cells.len(), "flattened hive");
    Ok(hive)
}

/// Flattens an input and appends it to `doc` as a new hive.
pub fn flatten_into<R: BufRead>(doc: &mut RegXMLObject, reader: R, filename: &str) -> Result<()> {
    let hive = flatten_hive(reader, filename)?;
    doc.append_hive(hive);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::objects::{CellKind, Provenance};
    use crate::writer::RegXMLWriter;
    use std::io::Cursor;

    const HIVE: &str = r#"<hive>
  <key root="1" name="ROOT">
    <mtime>2009-05-01T12:00:00Z</mtime>
    <key name="Select">
      <value name="Current" type="int32" value="1"/>
    </key>
    <value default="1" type="string">Hello</value>
  </key>
</hive>"#;

    #[test]
    fn test_flatten_order() {
        let hive = flatten_hive(Cursor::new(HIVE), "SYSTEM.xml").unwrap();
        assert_eq!(hive.filename.as_deref(), Some("SYSTEM.xml"));
        let paths: Vec<_> = hive.cells.iter().map(|c| c.cellpath.as_str()).collect();
        assert_eq!(
            paths,
            [
                "\\ROOT\\Select\\Current",
                "\\ROOT\\Select",
                "\\ROOT\\Default",
                "\\ROOT",
            ]
        );
        assert_eq!(hive.cells[3].kind, CellKind::Key);
        assert!(hive.cells[3].mtime.is_some());
    }

    #[test]
    fn test_flatten_and_write() {
        let mut doc = RegXMLObject::with_provenance(Provenance::new("flatten_regxml", "0.1.0"));
        flatten_into(&mut doc, Cursor::new(HIVE), "a.xml").unwrap();
        flatten_into(&mut doc, Cursor::new(HIVE), "b.xml").unwrap();
        assert_eq!(doc.hives().count(), 2);
        assert_eq!(doc.iter_cells().count(), 8);

        let xml = RegXMLWriter::new().write_to_string(&doc).unwrap();
        assert_eq!(xml.matches("<cellobject").count(), 8);
        assert!(xml.contains("<data>Hello</data>"));
    }

    #[test]
    fn test_flatten_rejects_duplicates() {
        let xml = r#"<hive><key root="1" name="R"><key name="A"/><key name="A"/></key></hive>"#;
        let mut doc = RegXMLObject::new();
        let err = flatten_into(&mut doc, Cursor::new(xml), "dup.xml").unwrap_err();
        assert!(matches!(err, Error::DuplicateCellpath(ref p) if p == "\\R\\A"));
        assert_eq!(doc.hives().count(), 0);
    }
}
