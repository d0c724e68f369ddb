use std::env;
use std::process::ExitCode;

use mu_xml::path::ElementPath;
use mu_xml::{Stream, StreamFlags, Termination, XmlError, XmlEvent, XmlReader};

#[derive(Clone, Debug)]
enum Json {
    Null,
    Num(usize),
    Str(String),
    Arr(Vec<Json>),
    Obj(Vec<(&'static str, Json)>),
}

impl Json {
    fn render(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        match self {
            Json::Null => out.push_str("null"),
            Json::Num(v) => out.push_str(&v.to_string()),
            Json::Str(v) => write_json_string(out, v),
            Json::Arr(items) => {
                out.push('[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    item.write_into(out);
                }
                out.push(']');
            }
            Json::Obj(fields) => {
                out.push('{');
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    write_json_string(out, key);
                    out.push(':');
                    value.write_into(out);
                }
                out.push('}');
            }
        }
    }
}

fn write_json_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c <= '\u{1f}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let mut rest = args.into_iter().skip(1).collect::<Vec<_>>();
    let compressed = pop_flag(&mut rest, "--zlib");

    if rest.is_empty() || rest[0] == "--help" || rest[0] == "-h" {
        print_help();
        return Ok(());
    }

    let mut flags = StreamFlags::READ_ONLY;
    if compressed {
        flags = flags | StreamFlags::COMPRESSED;
    }

    let cmd = rest.remove(0);
    match cmd.as_str() {
        "dump" => {
            let url = first_arg(&rest, "dump requires <url>")?;
            let mut stream = Stream::open(&url, flags).map_err(display_err)?;
            let mut reader = XmlReader::open(&mut stream);
            let mut out = String::new();
            reader.dump(&mut out).map_err(|e| e.to_string())?;
            print!("{}", out);
            report_failure(&reader)?;
        }
        "events" => {
            let url = first_arg(&rest, "events requires <url>")?;
            let mut stream = Stream::open(&url, flags).map_err(display_err)?;
            let mut reader = XmlReader::open(&mut stream);
            let mut path = ElementPath::new();
            while reader.has_next() {
                path.track(&reader);
                println!("{}", event_json(&reader, &path).render());
                reader.advance();
            }
            report_failure(&reader)?;
        }
        "seek" => {
            let url = first_arg(&rest, "seek requires <url> <path>")?;
            let target = rest
                .get(1)
                .cloned()
                .ok_or_else(|| "seek requires <url> <path>".to_string())?;
            let mut stream = Stream::open(&url, flags).map_err(display_err)?;
            let mut reader = XmlReader::open(&mut stream);
            if !reader.seek(&target) {
                report_failure(&reader)?;
                return Err(display_err(XmlError::PathNotFound(target)));
            }
            let attributes = reader
                .attributes()
                .map(|table| {
                    table
                        .iter()
                        .map(|a| {
                            Json::Obj(vec![
                                ("name", Json::Str(a.name.clone())),
                                ("value", Json::Str(a.value.clone())),
                            ])
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let output = Json::Obj(vec![
                ("path", Json::Str(target)),
                ("offset", Json::Num(reader.offset() as usize)),
                ("element", Json::Str(reader.raw_element().to_string())),
                ("attributes", Json::Arr(attributes)),
            ]);
            println!("{}", output.render());
        }
        other => return Err(format!("unknown command '{}'", other)),
    }
    Ok(())
}

fn event_json(reader: &XmlReader<'_, '_>, path: &ElementPath) -> Json {
    let (kind, payload) = match reader.event() {
        XmlEvent::DocumentBegin => (
            "document",
            reader.version().map_or(Json::Null, |v| Json::Str(v.to_string())),
        ),
        XmlEvent::ElementBegin => ("begin", name_json(reader)),
        XmlEvent::ElementEnd => ("end", name_json(reader)),
        XmlEvent::Text => ("text", Json::Str(reader.text().unwrap_or_default().to_string())),
        XmlEvent::Comment => (
            "comment",
            Json::Str(reader.comment().unwrap_or_default().to_string()),
        ),
        XmlEvent::Cdata => ("cdata", Json::Str(reader.cdata().unwrap_or_default().to_string())),
        XmlEvent::Null => ("null", Json::Null),
    };
    Json::Obj(vec![
        ("event", Json::Str(kind.to_string())),
        ("depth", Json::Num(path.depth())),
        ("path", Json::Str(path.as_str().to_string())),
        ("value", payload),
    ])
}

fn name_json(reader: &XmlReader<'_, '_>) -> Json {
    reader
        .element_name()
        .map_or(Json::Null, |name| Json::Str(name.to_string()))
}

fn report_failure(reader: &XmlReader<'_, '_>) -> Result<(), String> {
    match reader.termination() {
        Some(Termination::Failed(err)) => Err(display_err(err.clone())),
        _ => Ok(()),
    }
}

fn first_arg(args: &[String], msg: &str) -> Result<String, String> {
    args.first().cloned().ok_or_else(|| msg.to_string())
}

fn pop_flag(args: &mut Vec<String>, flag: &str) -> bool {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        args.remove(pos);
        true
    } else {
        false
    }
}

fn display_err<E: Into<XmlError>>(err: E) -> String {
    err.into().to_string()
}

fn print_help() {
    let help = r#"mu-xml - inspect XML documents from files or sockets

USAGE:
  mu-xml [--zlib] <command> [args...]

COMMANDS:
  dump <url>            re-serialize every event
  events <url>          one JSON object per event
  seek <url> <path>     locate an element by absolute path (/a/b/c)

NOTES:
  <url> is a file path, file://path, or tcp://host:port
  --zlib decodes a zlib-compressed source
"#;
    print!("{}", help);
}
