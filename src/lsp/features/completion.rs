//! Rendering of engine autocomplete entries as LSP completion items

use tower_lsp::lsp_types::{
    Command, CompletionItem, CompletionItemKind, CompletionItemTag, Documentation, InsertTextFormat,
    MarkupContent, MarkupKind,
};

use crate::engine::to_string::to_string;
use crate::engine::types::Type;
use crate::engine::{AutocompleteEntry, AutocompleteEntryKind, AutocompleteResult, ParenthesesRecommendation, TypeArena};
use crate::lsp::documentation::DocumentationProvider;

/// Table name the Roblox definitions give to event objects.
const EVENT_TABLE_NAME: &str = "RBXScriptSignal";

fn base_kind(kind: AutocompleteEntryKind) -> CompletionItemKind {
    match kind {
        AutocompleteEntryKind::Property => CompletionItemKind::FIELD,
        AutocompleteEntryKind::Binding => CompletionItemKind::VARIABLE,
        AutocompleteEntryKind::Keyword => CompletionItemKind::KEYWORD,
        AutocompleteEntryKind::String => CompletionItemKind::CONSTANT,
        AutocompleteEntryKind::Type => CompletionItemKind::INTERFACE,
        AutocompleteEntryKind::Module => CompletionItemKind::MODULE,
    }
}

fn trigger_signature_help() -> Command {
    Command {
        title: "Trigger Signature Help".to_string(),
        command: "editor.action.triggerParameterHints".to_string(),
        arguments: None,
    }
}

fn completion_item(
    name: String,
    entry: AutocompleteEntry,
    types: Option<&TypeArena>,
    docs: &dyn DocumentationProvider,
) -> CompletionItem {
    let mut item = CompletionItem {
        kind: Some(base_kind(entry.kind)),
        documentation: entry
            .documentation_symbol
            .as_deref()
            .and_then(|symbol| docs.print_documentation(symbol))
            .map(|value| Documentation::MarkupContent(MarkupContent { kind: MarkupKind::Markdown, value })),
        ..Default::default()
    };

    if entry.deprecated {
        item.deprecated = Some(true);
        item.tags = Some(vec![CompletionItemTag::DEPRECATED]);
    }

    match entry.parens {
        ParenthesesRecommendation::None => {}
        ParenthesesRecommendation::CursorAfter => {
            item.insert_text = Some(format!("{}()$0", name));
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
        }
        ParenthesesRecommendation::CursorInside => {
            item.insert_text = Some(format!("{}($1)$0", name));
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item.command = Some(trigger_signature_help());
        }
    }

    if let (Some(ty), Some(types)) = (entry.ty, types) {
        let ty = types.follow(ty);
        match types.get(ty) {
            Some(Type::Function(_)) => item.kind = Some(CompletionItemKind::FUNCTION),
            Some(Type::Table(table)) if table.name.as_deref() == Some(EVENT_TABLE_NAME) => {
                item.kind = Some(CompletionItemKind::EVENT)
            }
            Some(Type::Class(_)) => item.kind = Some(CompletionItemKind::CLASS),
            _ => {}
        }
        item.detail = Some(to_string(types, ty));
    }

    item.label = name;
    item
}

/// Converts an autocomplete result into completion items, in name order.
/// Entry types are rendered from `types`, the queried module's arena.
pub fn completion_items(
    result: AutocompleteResult,
    types: Option<&TypeArena>,
    docs: &dyn DocumentationProvider,
) -> Vec<CompletionItem> {
    result
        .entries
        .into_iter()
        .map(|(name, entry)| completion_item(name, entry, types, docs))
        .collect()
}
