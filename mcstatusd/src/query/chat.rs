//! Flattening of JSON chat components into legacy `§`-coded text.
//!
//! Modern servers send their description as a component tree. The MOTD
//! renderer only understands the legacy form, so styling is re-expressed
//! as formatting codes. Hex colours have no legacy code and are dropped.

use serde_json::{Map, Value};
use shared::protocol::FORMAT_CHAR;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Format {
    color: Option<char>,
    bold: bool,
    italic: bool,
    underlined: bool,
    strikethrough: bool,
    obfuscated: bool,
}

impl Format {
    fn inherit(&self, obj: &Map<String, Value>) -> Self {
        let flag = |key: &str, parent: bool| obj.get(key).and_then(Value::as_bool).unwrap_or(parent);

        Self {
            color: obj
                .get("color")
                .and_then(Value::as_str)
                .map(named_color)
                .unwrap_or(self.color),
            bold: flag("bold", self.bold),
            italic: flag("italic", self.italic),
            underlined: flag("underlined", self.underlined),
            strikethrough: flag("strikethrough", self.strikethrough),
            obfuscated: flag("obfuscated", self.obfuscated),
        }
    }

    fn write_codes(&self, out: &mut String) {
        let mut code = |c: char| {
            out.push(FORMAT_CHAR);
            out.push(c);
        };

        if let Some(color) = self.color {
            code(color);
        }
        if self.obfuscated {
            code('k');
        }
        if self.bold {
            code('l');
        }
        if self.strikethrough {
            code('m');
        }
        if self.underlined {
            code('n');
        }
        if self.italic {
            code('o');
        }
    }
}

fn named_color(name: &str) -> Option<char> {
    let code = match name {
        "black" => '0',
        "dark_blue" => '1',
        "dark_green" => '2',
        "dark_aqua" => '3',
        "dark_red" => '4',
        "dark_purple" => '5',
        "gold" => '6',
        "gray" => '7',
        "dark_gray" => '8',
        "blue" => '9',
        "green" => 'a',
        "aqua" => 'b',
        "red" => 'c',
        "light_purple" => 'd',
        "yellow" => 'e',
        "white" => 'f',
        _ => return None,
    };
    Some(code)
}

struct Flattener {
    out: String,
    current: Format,
}

impl Flattener {
    fn emit(&mut self, text: &str, format: &Format) {
        if text.is_empty() {
            return;
        }

        if *format != self.current {
            if self.current != Format::default() {
                self.out.push(FORMAT_CHAR);
                self.out.push('r');
            }
            format.write_codes(&mut self.out);
            self.current = format.clone();
        }
        self.out.push_str(text);
    }

    fn walk(&mut self, value: &Value, parent: &Format) {
        match value {
            Value::String(text) => self.emit(text, parent),
            Value::Array(items) => {
                for item in items {
                    self.walk(item, parent);
                }
            }
            Value::Object(obj) => {
                let format = parent.inherit(obj);
                let text = obj
                    .get("text")
                    .or_else(|| obj.get("translate"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                self.emit(text, &format);

                if let Some(extra) = obj.get("extra") {
                    self.walk(extra, &format);
                }
            }
            Value::Null => {}
            other => self.emit(&other.to_string(), parent),
        }
    }
}

/// Turn a `description` value into a single legacy-formatted string.
pub fn flatten(value: &Value) -> String {
    let mut flattener = Flattener {
        out: String::new(),
        current: Format::default(),
    };
    flattener.walk(value, &Format::default());
    flattener.out
}
