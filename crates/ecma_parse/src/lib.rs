//! Thin construction helpers around the swc lexer/parser so the rest of the
//! workspace never has to spell out syntax configuration.

use swc_common::input::StringInput;
use swc_common::sync::Lrc;
use swc_common::{FileName, SourceFile, SourceMap};
use swc_ecma_ast::Module;
use swc_ecma_parser::error::Error as ParseError;
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, Syntax};
use swc_ecma_visit::{Visit, VisitWith};

pub fn create_lexer(fm: &SourceFile) -> Lexer {
    Lexer::new(
        Syntax::Es(EsSyntax {
            jsx: false,
            ..Default::default()
        }),
        Default::default(),
        StringInput::from(fm),
        None,
    )
}

pub fn create_parser(fm: &Lrc<SourceFile>) -> Parser<Lexer> {
    Parser::new_from(create_lexer(fm))
}

/// Parse a source string as an ES module. Returns the source map alongside
/// the module so callers can report spans if they want to.
pub fn parse_ecma_src<TName, TBody>(
    name_str: TName,
    body: TBody,
) -> Result<(Lrc<SourceMap>, Module), ParseError>
where
    TName: Into<String>,
    TBody: ToString,
{
    let cm = Lrc::<SourceMap>::default();
    let fname: Lrc<FileName> = Lrc::new(FileName::Custom(name_str.into()));
    let fm = cm.new_source_file(fname, body.to_string());

    let mut parser = create_parser(&fm);
    let module = parser.parse_module()?;

    Ok((cm, module))
}

/// Parse a source string and run a visitor over it. Test helper, mostly.
pub fn parse_and_visit(src: &str, visitor: &mut impl Visit) -> Result<(), ParseError> {
    let (_, module) = parse_ecma_src("test.js", src)?;
    module.visit_with(visitor);
    Ok(())
}

/// Human-readable message for a parse failure, without needing a handler.
pub fn parse_error_message(err: &ParseError) -> String {
    err.kind().msg().to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_module_with_dynamic_import() {
        let (_, module) = parse_ecma_src("a.js", r#"import("./b.js");"#).unwrap();
        assert_eq!(module.body.len(), 1);
    }

    #[test]
    fn reports_parse_failure() {
        let err = match parse_ecma_src("bad.js", "import {") {
            Err(e) => e,
            Ok(_) => panic!("expected parse failure"),
        };
        assert!(!parse_error_message(&err).is_empty());
    }
}
