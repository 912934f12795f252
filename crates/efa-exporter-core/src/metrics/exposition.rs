//! Prometheus text exposition format (version 0.0.4).

use std::collections::BTreeMap;
use std::fmt::Write;

use super::Sample;

/// Escapes a label value: backslash, double quote and newline.
pub fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Renders samples as text exposition.
///
/// Samples are grouped into families by name; families are written in name
/// order with one `# HELP` and `# TYPE` header each, and samples keep their
/// emission order inside a family.
pub fn render_text(samples: &[Sample]) -> String {
    let mut families: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        families.entry(sample.name.as_str()).or_default().push(sample);
    }

    let mut out = String::new();
    for (name, family) in families {
        let first = family[0];
        // Writing into a String cannot fail.
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(first.help));
        let _ = writeln!(out, "# TYPE {} {}", name, first.kind.as_str());
        for sample in family {
            out.push_str(name);
            if !sample.labels.is_empty() {
                out.push('{');
                for (i, (key, value)) in sample.labels.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}=\"{}\"", key, escape_label_value(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", sample.value);
        }
    }
    out
}
