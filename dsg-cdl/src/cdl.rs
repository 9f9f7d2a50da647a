//! Render a dataset as CDL, the text notation printed by `ncdump` and read by `ncgen`.
//!
use std::fmt::{self, Write};

use ndarray::ArrayD;

use dsg::memory::{Attribute, Cell, Dataset, StoredVariable, TypeRef};
use dsg::{ScalarKind, Value, XType};

/// Render the complete header and data of `dataset`.
///
/// The file name without its extension becomes the dataset name. Unwritten cells and cells
/// holding their type's fill value are rendered as `_`.
///
pub fn render(dataset: &Dataset) -> Result<String, fmt::Error> {
    let name = dataset
        .path()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("dataset"));

    let mut out = String::new();
    writeln!(out, "netcdf {} {{", escape_name(&name))?;
    write_types(&mut out, dataset)?;
    write_dimensions(&mut out, dataset)?;
    write_variables(&mut out, dataset)?;
    write_global_attributes(&mut out, dataset)?;

    writeln!(out, "data:")?;
    for var in dataset.variables() {
        write_data(&mut out, dataset, var)?;
    }
    writeln!(out, "}}")?;

    Ok(out)
}

fn write_types(out: &mut String, dataset: &Dataset) -> fmt::Result {
    if dataset.types().is_empty() {
        return Ok(());
    }

    writeln!(out, "types:")?;
    for compound in dataset.types() {
        writeln!(out, "  compound {} {{", escape_name(&compound.name))?;
        for member in &compound.members {
            writeln!(out, "    {} {} ;", member.kind.name(), escape_name(&member.name))?;
        }
        writeln!(out, "  }}; // {}", escape_name(&compound.name))?;
    }

    Ok(())
}

fn write_dimensions(out: &mut String, dataset: &Dataset) -> fmt::Result {
    writeln!(out, "dimensions:")?;
    for dim in dataset.dimensions() {
        if dim.unlimited {
            writeln!(
                out,
                "\t{} = UNLIMITED ; // ({} currently)",
                escape_name(&dim.name),
                dim.len
            )?;
        } else {
            writeln!(out, "\t{} = {} ;", escape_name(&dim.name), dim.len)?;
        }
    }

    Ok(())
}

fn write_variables(out: &mut String, dataset: &Dataset) -> fmt::Result {
    writeln!(out, "variables:")?;
    for var in dataset.variables() {
        let name = escape_name(var.name());
        let dims = dataset.dim_names(var);
        if dims.is_empty() {
            writeln!(out, "\t{} {} ;", type_name(dataset, var.xtype()), name)?;
        } else {
            let dims: Vec<String> = dims.into_iter().map(escape_name).collect();
            writeln!(
                out,
                "\t{} {}({}) ;",
                type_name(dataset, var.xtype()),
                name,
                dims.join(", ")
            )?;
        }

        for (att, attribute) in var.attributes() {
            write_attribute(out, dataset, &name, att, attribute)?;
        }
    }

    Ok(())
}

fn write_global_attributes(out: &mut String, dataset: &Dataset) -> fmt::Result {
    if dataset.global_attributes().is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "// global attributes:")?;
    for (att, attribute) in dataset.global_attributes() {
        write_attribute(out, dataset, "", att, attribute)?;
    }

    Ok(())
}

fn write_attribute(
    out: &mut String,
    dataset: &Dataset,
    var: &str,
    name: &str,
    attribute: &Attribute,
) -> fmt::Result {
    match attribute {
        Attribute::Scalar(value) => writeln!(
            out,
            "\t\t{}:{} = {} ;",
            var,
            escape_name(name),
            attribute_value(value)
        ),
        Attribute::Compound { xtype, fields } => {
            let fields: Vec<String> = fields.iter().map(attribute_value).collect();
            writeln!(
                out,
                "\t\t{} {}:{} = {{{}}} ;",
                type_name(dataset, *xtype),
                var,
                escape_name(name),
                fields.join(", ")
            )
        }
    }
}

fn write_data(out: &mut String, dataset: &Dataset, var: &StoredVariable) -> fmt::Result {
    let cells = match dataset.cells(var.name()) {
        Some(cells) if !cells.is_empty() => cells,
        _ => return Ok(()),
    };
    let is_char = matches!(
        dataset.resolve(var.xtype()),
        Some(TypeRef::Atomic(ScalarKind::Char))
    );

    let rows = if is_char && cells.ndim() > 1 {
        text_rows(&cells)
    } else {
        value_rows(&cells)
    };

    writeln!(out)?;
    write!(out, " {} =", escape_name(var.name()))?;
    match rows.as_slice() {
        [row] => writeln!(out, " {row} ;"),
        rows => {
            writeln!(out)?;
            writeln!(out, "  {} ;", rows.join(",\n  "))
        }
    }
}

/// One quoted string per row of a `char` variable, cut at the first unwritten or NUL character.
fn text_rows(cells: &ArrayD<Option<Cell>>) -> Vec<String> {
    cells
        .rows()
        .into_iter()
        .map(|row| {
            let bytes: Vec<u8> = row
                .iter()
                .map_while(|cell| match cell {
                    Some(Cell::Scalar(Value::Char(c))) if *c != 0 => Some(*c),
                    _ => None,
                })
                .collect();
            quote(&String::from_utf8_lossy(&bytes))
        })
        .collect()
}

fn value_rows(cells: &ArrayD<Option<Cell>>) -> Vec<String> {
    if cells.ndim() == 0 {
        return vec![cells.iter().map(cell_value).collect::<Vec<_>>().join(", ")];
    }

    cells
        .rows()
        .into_iter()
        .map(|row| row.iter().map(cell_value).collect::<Vec<_>>().join(", "))
        .collect()
}

fn cell_value(cell: &Option<Cell>) -> String {
    match cell {
        None => String::from("_"),
        Some(Cell::Scalar(value)) => data_value(value),
        Some(Cell::Record(fields)) => {
            let fields: Vec<String> = fields.iter().map(data_value).collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

fn data_value(value: &Value) -> String {
    if value.kind().is_numeric() && *value == value.kind().fill_value() {
        return String::from("_");
    }

    match value {
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::F32(v) => format!("{v:?}"),
        Value::F64(v) => format!("{v:?}"),
        Value::Char(c) => format!("'{}'", escape_text(&char_text(*c))),
        Value::Text(text) => quote(text),
    }
}

/// Attribute values carry a type suffix, since CDL infers an attribute's type from its literal.
fn attribute_value(value: &Value) -> String {
    match value {
        Value::I8(v) => format!("{v}b"),
        Value::I16(v) => format!("{v}s"),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => format!("{v}LL"),
        Value::F32(v) => format!("{v:?}f"),
        Value::F64(v) => format!("{v:?}"),
        Value::Char(c) => quote(&char_text(*c)),
        Value::Text(text) => quote(text),
    }
}

/// A lone byte of UTF-8 text. Bytes past ASCII only mean something as part of a sequence.
fn char_text(c: u8) -> String {
    String::from_utf8_lossy(&[c]).into_owned()
}

fn type_name(dataset: &Dataset, xtype: XType) -> String {
    match dataset.resolve(xtype) {
        Some(TypeRef::Atomic(kind)) => kind.name().to_string(),
        Some(TypeRef::Compound(compound)) => escape_name(&compound.name),
        None => format!("type{}", xtype.0),
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", escape_text(text))
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }

    escaped
}

/// Backslash escape the characters CDL does not allow unescaped in a name
fn escape_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        let plain = c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-');
        if !plain || (i == 0 && c.is_ascii_digit()) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
