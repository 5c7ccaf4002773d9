//! USDA text output for shading networks.

use crate::network::{AttrValue, Attribute, Prim, PrimKind, ShadingNetwork};

/// Render a network as a USDA layer.
pub fn write_network(network: &ShadingNetwork) -> String {
    let mut builder = UsdaBuilder::new();
    builder.build(network);
    builder.output
}

/// Builder for USDA output.
struct UsdaBuilder {
    output: String,
    indent: usize,
}

impl UsdaBuilder {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    fn build(&mut self, network: &ShadingNetwork) {
        self.output.push_str("#usda 1.0\n");

        let roots: Vec<&Prim> = network.children("/").collect();
        if let Some(first) = roots.first() {
            self.output.push_str("(\n");
            self.output
                .push_str(&format!("    defaultPrim = \"{}\"\n", escape_string(first.name())));
            self.output.push_str(")\n");
        }

        for root in roots {
            self.write_line("");
            self.write_prim(network, root);
        }
    }

    fn write_prim(&mut self, network: &ShadingNetwork, prim: &Prim) {
        let header = format!("def {} \"{}\"", prim.kind.as_str(), prim.name());
        if prim.references.is_empty() {
            self.write_line(&header);
        } else {
            self.write_line(&format!("{} (", header));
            self.indent += 1;
            let refs: Vec<String> = prim.references.iter().map(|r| format!("<{}>", r)).collect();
            self.write_line(&format!("prepend references = {}", refs.join(", ")));
            self.indent -= 1;
            self.write_line(")");
        }
        self.write_line("{");
        self.indent += 1;

        if let Some(id) = &prim.shader_id {
            self.write_line(&format!("uniform token info:id = \"{}\"", escape_string(id)));
        }
        for (name, attr) in &prim.inputs {
            self.write_attribute("inputs", name, attr);
        }
        for (name, attr) in &prim.outputs {
            self.write_attribute("outputs", name, attr);
        }

        let children: Vec<&Prim> = network.children(&prim.path).collect();
        for child in children {
            if prim.kind != PrimKind::Shader {
                self.write_line("");
            }
            self.write_prim(network, child);
        }

        self.indent -= 1;
        self.write_line("}");
    }

    fn write_attribute(&mut self, namespace: &str, name: &str, attr: &Attribute) {
        let type_name = attr.value_type.as_str();
        match (&attr.connection, &attr.value) {
            (Some(conn), _) => self.write_line(&format!(
                "{} {}:{}.connect = <{}.{}>",
                type_name, namespace, name, conn.prim, conn.attribute
            )),
            (None, Some(value)) => self.write_line(&format!(
                "{} {}:{} = {}",
                type_name,
                namespace,
                name,
                format_value(value)
            )),
            (None, None) => self.write_line(&format!("{} {}:{}", type_name, namespace, name)),
        }
    }

    fn write_line(&mut self, line: &str) {
        if !line.is_empty() {
            for _ in 0..self.indent {
                self.output.push_str("    ");
            }
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}

fn format_value(value: &AttrValue) -> String {
    let tuple = |values: &[f64]| {
        let parts: Vec<String> = values.iter().map(|v| format_real(*v)).collect();
        format!("({})", parts.join(", "))
    };
    match value {
        AttrValue::Float(f) => format_real(*f),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Float2(v) => tuple(v),
        AttrValue::Float3(v) => tuple(v),
        AttrValue::Float4(v) => tuple(v),
        AttrValue::Token(s) | AttrValue::String(s) => format!("\"{}\"", escape_string(s)),
        AttrValue::Asset(s) => format!("@{}@", s),
    }
}

/// Format a real number for USD output.
pub fn format_real(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.abs() < 0.0001 || value.abs() >= 1e6 {
        format!("{:e}", value)
    } else if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.6}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Sanitize a name for use as a USD identifier.
pub fn sanitize_name(name: &str) -> String {
    let mut result = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if i == 0 && c.is_ascii_digit() {
                result.push('_');
            }
            result.push(c);
        } else {
            result.push('_');
        }
    }
    if result.is_empty() {
        result = "unnamed".to_string();
    }
    result
}

/// Escape a string for USD output.
pub fn escape_string(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }
    result
}
