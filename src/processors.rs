use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::names::normalize_ctor_dtor;
use crate::types::RefKind;

/// One fact extracted from a dump line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpEvent {
    EnterFunction { name: String, source_file: String },
    SetDisplayLabel { name: String, label: String },
    RegisterNameAlias { demangled: String, mangled: String },
    RecordReference { caller: String, callee: String, kind: RefKind },
}

mod patterns {
    use super::*;

    /// Old-style marker: `;; Function foo`
    pub static LEGACY_FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^;; Function (\S+)\s*$").expect("Invalid legacy function regex")
    });

    /// Marker with demangled and mangled names:
    /// `;; Function Foo::Foo() (_ZN3FooC2Ev, funcdef_no=1, ...) [flags]`
    ///
    /// The demangled part is greedy: it may itself contain ` (` for function-pointer
    /// parameters, so the mangled name is the last group before the optional suffixes.
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^;; Function (.*)\s+\(([^\s,()]+)(?:,[^)]*)?\)(?:\s*(?:\(executed once\)|\[[^\]]*\]))*\s*$",
        )
        .expect("Invalid function regex")
    });

    /// `(call (mem:QI (symbol_ref:DI ("foo") ...`
    pub static CALL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"\(call\b[^"]*"([^"]*)""#).expect("Invalid call regex")
    });

    /// `(symbol_ref:DI ("foo") ...` outside a call
    pub static SYMBOL_REF: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"\(symbol_ref\b[^"]*"([^"]*)""#).expect("Invalid symbol_ref regex")
    });
}

/// Logical source name of a dump file: the file name minus its last two extensions,
/// so `src/foo.c.192r.expand` becomes `src/foo.c`.
pub fn source_name(path: &Path) -> String {
    let full = path.to_string_lossy();
    let Some(file_name) = path.file_name().map(|f| f.to_string_lossy()) else {
        return full.into_owned();
    };

    let mut stem: &str = &file_name;
    for _ in 0..2 {
        match stem.rfind('.') {
            Some(dot) => stem = &stem[..dot],
            None => return full.into_owned(),
        }
    }

    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.join(stem).to_string_lossy().into_owned(),
        None => stem.to_string(),
    }
}

/// Turn a whole dump into events.
///
/// The enclosing function is carried line to line as the fold accumulator.
pub fn parse_dump(source_file: &str, text: &str) -> Result<Vec<DumpEvent>> {
    let mut events = Vec::new();
    text.lines()
        .enumerate()
        .try_fold(None, |current, (idx, line)| {
            parse_line(source_file, idx + 1, line, current, &mut events)
        })?;
    Ok(events)
}

fn parse_line(
    source_file: &str,
    line_no: usize,
    line: &str,
    current: Option<String>,
    events: &mut Vec<DumpEvent>,
) -> Result<Option<String>> {
    if let Some(caps) = patterns::LEGACY_FUNCTION.captures(line) {
        let name = caps[1].to_string();
        events.push(DumpEvent::EnterFunction {
            name: name.clone(),
            source_file: source_file.to_string(),
        });
        return Ok(Some(name));
    }

    if let Some(caps) = patterns::FUNCTION.captures(line) {
        let demangled = &caps[1];
        let mangled = normalize_ctor_dtor(&caps[2]).into_owned();
        events.push(DumpEvent::EnterFunction {
            name: mangled.clone(),
            source_file: source_file.to_string(),
        });
        if demangled != mangled {
            events.push(DumpEvent::SetDisplayLabel {
                name: mangled.clone(),
                label: demangled.to_string(),
            });
            events.push(DumpEvent::RegisterNameAlias {
                demangled: demangled.to_string(),
                mangled: mangled.clone(),
            });
        }
        return Ok(Some(mangled));
    }

    let reference = if let Some(caps) = patterns::CALL.captures(line) {
        // Leading carets are a short-call marker on some targets
        Some((caps[1].trim_start_matches('^').to_string(), RefKind::Call))
    } else {
        patterns::SYMBOL_REF
            .captures(line)
            .map(|caps| (caps[1].to_string(), RefKind::Reference))
    };

    if let Some((callee, kind)) = reference {
        let Some(caller) = current.clone() else {
            return Err(Error::OrphanReference {
                file: source_file.to_string(),
                line: line_no,
                text: line.trim().to_string(),
            });
        };
        events.push(DumpEvent::RecordReference {
            caller,
            callee,
            kind,
        });
    }

    Ok(current)
}
