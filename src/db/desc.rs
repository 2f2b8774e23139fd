// src/db/desc.rs

//! Pacman descriptor file format
//!
//! Each package entry in a repository database holds up to three text files
//! (`desc`, `depends`, `files`) made of `%FIELD%` headers followed by one
//! value per line and terminated by a blank line.

use crate::db::models::Package;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt::Write;

/// Parse a descriptor file into its fields
pub fn parse_fields(content: &str) -> HashMap<String, Vec<String>> {
    let mut fields = HashMap::new();
    let mut current_field: Option<String> = None;
    let mut values: Vec<String> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.len() > 1 && trimmed.starts_with('%') && trimmed.ends_with('%') {
            if let Some(field) = current_field.take() {
                fields.insert(field, std::mem::take(&mut values));
            }
            current_field = Some(trimmed[1..trimmed.len() - 1].to_string());
        } else if !trimmed.is_empty() && current_field.is_some() {
            values.push(trimmed.to_string());
        }
    }

    if let Some(field) = current_field {
        fields.insert(field, values);
    }

    fields
}

/// Apply the fields of any descriptor file (`desc`, `depends` or `files`)
/// onto a record
pub fn apply_fields(pkg: &mut Package, mut fields: HashMap<String, Vec<String>>) -> Result<()> {
    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    let first = |values: Vec<String>| values.into_iter().next();

    if let Some(v) = first(take("FILENAME")) {
        pkg.filename = v;
    }
    if let Some(v) = first(take("NAME")) {
        pkg.name = v;
    }
    if let Some(v) = first(take("BASE")) {
        pkg.base = Some(v);
    }
    if let Some(v) = first(take("VERSION")) {
        pkg.version = v;
    }
    if let Some(v) = first(take("DESC")) {
        pkg.description = Some(v);
    }
    if let Some(v) = first(take("URL")) {
        pkg.url = Some(v);
    }
    if let Some(v) = first(take("PACKAGER")) {
        pkg.packager = Some(v);
    }
    if let Some(v) = first(take("ARCH")) {
        pkg.architecture = v;
    }
    if let Some(v) = first(take("MD5SUM")) {
        pkg.md5sum = Some(v);
    }
    if let Some(v) = first(take("SHA256SUM")) {
        pkg.sha256sum = Some(v);
    }
    if let Some(v) = first(take("PGPSIG")) {
        pkg.pgp_signature = Some(v);
    }
    if let Some(v) = first(take("BUILDDATE")) {
        pkg.build_date = parse_number(&v, "BUILDDATE")?;
    }
    if let Some(v) = first(take("CSIZE")) {
        pkg.compressed_size = parse_number(&v, "CSIZE")?;
    }
    if let Some(v) = first(take("ISIZE")) {
        pkg.installed_size = parse_number(&v, "ISIZE")?;
    }

    extend(&mut pkg.licenses, take("LICENSE"));
    extend(&mut pkg.groups, take("GROUPS"));
    extend(&mut pkg.replaces, take("REPLACES"));
    extend(&mut pkg.depends, take("DEPENDS"));
    extend(&mut pkg.conflicts, take("CONFLICTS"));
    extend(&mut pkg.provides, take("PROVIDES"));
    extend(&mut pkg.optdepends, take("OPTDEPENDS"));
    extend(&mut pkg.makedepends, take("MAKEDEPENDS"));
    extend(&mut pkg.checkdepends, take("CHECKDEPENDS"));
    extend(&mut pkg.files, take("FILES"));

    Ok(())
}

fn extend(target: &mut Vec<String>, values: Vec<String>) {
    if !values.is_empty() {
        *target = values;
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::DatabaseError(format!("Invalid %{}% value: {}", field, value)))
}

/// Render the `desc` file of a record
pub fn render_desc(pkg: &Package) -> String {
    let mut out = String::new();
    write_field(&mut out, "FILENAME", [pkg.filename.as_str()]);
    write_field(&mut out, "NAME", [pkg.name.as_str()]);
    write_field(&mut out, "BASE", pkg.base.as_deref());
    write_field(&mut out, "VERSION", [pkg.version.as_str()]);
    write_field(&mut out, "DESC", pkg.description.as_deref());
    write_field(&mut out, "GROUPS", pkg.groups.iter().map(String::as_str));
    write_field(&mut out, "CSIZE", [pkg.compressed_size.to_string().as_str()]);
    write_field(&mut out, "ISIZE", [pkg.installed_size.to_string().as_str()]);
    write_field(&mut out, "MD5SUM", pkg.md5sum.as_deref());
    write_field(&mut out, "SHA256SUM", pkg.sha256sum.as_deref());
    write_field(&mut out, "PGPSIG", pkg.pgp_signature.as_deref());
    write_field(&mut out, "URL", pkg.url.as_deref());
    write_field(&mut out, "LICENSE", pkg.licenses.iter().map(String::as_str));
    write_field(&mut out, "ARCH", [pkg.architecture.as_str()]);
    write_field(&mut out, "BUILDDATE", [pkg.build_date.to_string().as_str()]);
    write_field(&mut out, "PACKAGER", pkg.packager.as_deref());
    write_field(&mut out, "REPLACES", pkg.replaces.iter().map(String::as_str));
    out
}

/// Render the `depends` file of a record
pub fn render_depends(pkg: &Package) -> String {
    let mut out = String::new();
    write_field(&mut out, "DEPENDS", pkg.depends.iter().map(String::as_str));
    write_field(&mut out, "CONFLICTS", pkg.conflicts.iter().map(String::as_str));
    write_field(&mut out, "PROVIDES", pkg.provides.iter().map(String::as_str));
    write_field(&mut out, "OPTDEPENDS", pkg.optdepends.iter().map(String::as_str));
    write_field(&mut out, "MAKEDEPENDS", pkg.makedepends.iter().map(String::as_str));
    write_field(&mut out, "CHECKDEPENDS", pkg.checkdepends.iter().map(String::as_str));
    out
}

/// Render the `files` file of a record
pub fn render_files(pkg: &Package) -> String {
    let mut out = String::new();
    write_field(&mut out, "FILES", pkg.files.iter().map(String::as_str));
    out
}

/// Append one field; empty fields are omitted entirely
fn write_field<'a>(out: &mut String, key: &str, values: impl IntoIterator<Item = &'a str>) {
    let mut values = values.into_iter().filter(|v| !v.is_empty()).peekable();
    if values.peek().is_none() {
        return;
    }

    let _ = writeln!(out, "%{}%", key);
    for value in values {
        let _ = writeln!(out, "{}", value);
    }
    out.push('\n');
}
