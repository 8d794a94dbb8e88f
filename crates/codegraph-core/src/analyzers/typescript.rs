//! TypeScript (and TSX) analyzer: reuses the ECMAScript tag query plus
//! interface/type-alias definitions unique to TypeScript's grammar.

use serde_json::json;

use super::javascript::analyze_ecma;
use super::tag_query::{self, CaptureRole};
use super::{common, AnalysisContext, Analyzer};
use crate::model::ParseResult;
use crate::parser::SupportedLanguage;

const TS_ONLY_QUERY: &str = r#"
(interface_declaration name: (type_identifier) @name.definition.interface) @definition.interface
(type_alias_declaration name: (type_identifier) @name.definition.typedef) @definition.typedef
"#;

pub struct TypeScriptAnalyzer {
    pub tsx: bool,
}

impl Analyzer for TypeScriptAnalyzer {
    fn language(&self) -> SupportedLanguage {
        if self.tsx {
            SupportedLanguage::Tsx
        } else {
            SupportedLanguage::TypeScript
        }
    }

    fn analyze(&self, ctx: &AnalysisContext) -> ParseResult {
        let mut result = analyze_ecma(ctx);

        let language = ctx.language.tree_sitter_language().unwrap();
        let captures = tag_query::run(TS_ONLY_QUERY, language, ctx.tree, ctx.source);
        let extra: Vec<_> = captures
            .iter()
            .filter(|c| c.role == CaptureRole::Definition)
            .map(|c| common::entity_from_capture(c, ctx, json!({})))
            .collect();

        if !extra.is_empty() {
            let file = result.entities[0].clone();
            result.relationships.extend(common::containment_relationships(&file, &extra));
            result.entities.extend(extra);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn extracts_interface() {
        let source = "interface Point { x: number; y: number; }\n";
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        let ctx = AnalysisContext {
            file_path: "a.ts",
            source: source.as_bytes(),
            tree: &tree,
            content_hash: "h",
            language: SupportedLanguage::TypeScript,
        };
        let result = TypeScriptAnalyzer { tsx: false }.analyze(&ctx);
        assert!(result.entities.iter().any(|e| e.name == "Point"));
    }
}
