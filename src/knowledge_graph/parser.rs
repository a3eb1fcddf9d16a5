use rio_api::model::{Literal, Subject, Term, Triple};
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesParser, TurtleError, TurtleParser};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{RawGraph, RawLiteral, RawValue};
use crate::error::{CatalogError, CatalogResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RdfSyntax {
    Turtle,
    NTriples,
}

impl RdfSyntax {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("ttl") | Some("turtle") => Some(Self::Turtle),
            Some("nt") => Some(Self::NTriples),
            _ => None,
        }
    }
}

/// Load everything behind one source path into a single graph.
///
/// A file is parsed according to its extension (unknown extensions are read
/// as Turtle). A directory is walked recursively and every `.ttl` / `.nt`
/// file is merged in sorted path order.
pub fn load_source_graph(source_tag: &str, path: &Path) -> CatalogResult<RawGraph> {
    if !path.exists() {
        return Err(CatalogError::SourceNotFound {
            source_tag: source_tag.to_string(),
            path: path.to_path_buf(),
        });
    }

    let files = if path.is_dir() {
        collect_rdf_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut graph = RawGraph::new();
    for (index, file) in files.iter().enumerate() {
        let syntax = RdfSyntax::from_path(file).unwrap_or(RdfSyntax::Turtle);
        let handle = File::open(file).map_err(|source| CatalogError::Io {
            path: file.clone(),
            source,
        })?;
        let scope = format!("{}{}", source_tag, index);
        let parsed = parse_reader(BufReader::new(handle), syntax, &scope)
            .map_err(|e| CatalogError::Parse {
                path: file.clone(),
                message: e.to_string(),
            })?;
        debug!("Parsed {} triples from {}", parsed.triple_count(), file.display());
        graph.merge(parsed);
    }

    info!(
        "Source '{}' loaded: {} files, {} triples, {} nodes",
        source_tag,
        files.len(),
        graph.triple_count(),
        graph.node_count()
    );
    Ok(graph)
}

fn collect_rdf_files(dir: &Path) -> CatalogResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CatalogError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && RdfSyntax::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn parse_turtle_str(text: &str) -> Result<RawGraph, TurtleError> {
    parse_reader(text.as_bytes(), RdfSyntax::Turtle, "inline")
}

pub fn parse_ntriples_str(text: &str) -> Result<RawGraph, TurtleError> {
    parse_reader(text.as_bytes(), RdfSyntax::NTriples, "inline")
}

/// `scope` namespaces blank node labels so separate documents never share one.
fn parse_reader<R: BufRead>(reader: R, syntax: RdfSyntax, scope: &str) -> Result<RawGraph, TurtleError> {
    let mut graph = RawGraph::new();
    let mut on_triple = |triple: Triple<'_>| -> Result<(), TurtleError> {
        add_triple(&mut graph, &triple, scope);
        Ok(())
    };

    match syntax {
        RdfSyntax::Turtle => TurtleParser::new(reader, None).parse_all(&mut on_triple)?,
        RdfSyntax::NTriples => NTriplesParser::new(reader).parse_all(&mut on_triple)?,
    }

    Ok(graph)
}

fn blank_id(scope: &str, label: &str) -> String {
    format!("_:{}_{}", scope, label)
}

fn add_triple(graph: &mut RawGraph, triple: &Triple<'_>, scope: &str) {
    let subject = match triple.subject {
        Subject::NamedNode(node) => node.iri.to_string(),
        Subject::BlankNode(node) => blank_id(scope, node.id),
        // RDF-star quoted triples carry nothing we extract
        _ => return,
    };

    let value = match triple.object {
        Term::NamedNode(node) => RawValue::Reference(node.iri.to_string()),
        Term::BlankNode(node) => RawValue::Anonymous(blank_id(scope, node.id)),
        Term::Literal(literal) => RawValue::Literal(convert_literal(literal)),
        _ => return,
    };

    graph.add_property(&subject, triple.predicate.iri, value);
}

fn convert_literal(literal: Literal<'_>) -> RawLiteral {
    match literal {
        Literal::Simple { value } => RawLiteral::simple(value),
        Literal::LanguageTaggedString { value, language } => RawLiteral {
            value: value.to_string(),
            datatype: None,
            language: Some(language.to_string()),
        },
        Literal::Typed { value, datatype } => RawLiteral {
            value: value.to_string(),
            datatype: Some(datatype.iri.to_string()),
            language: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = r#"
@prefix schema: <https://schema.org/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

<https://example.org/courses/a> a schema:Course ;
    schema:name "Course A"@en ;
    schema:provider [ a schema:Organization ; schema:name "Org" ] ;
    schema:datePublished "2024-02-01"^^xsd:date .
"#;

    #[test]
    fn test_parse_turtle_groups_by_subject() {
        let graph = parse_turtle_str(SAMPLE).unwrap();
        let course = graph.node("https://example.org/courses/a").unwrap();
        assert!(course.has_type("Course"));

        let name = course.first_literal("name").unwrap();
        assert_eq!(name.value, "Course A");
        assert_eq!(name.language.as_deref(), Some("en"));

        let provider = course.first("provider").unwrap();
        assert!(matches!(provider, RawValue::Anonymous(id) if id.starts_with("_:inline_")));
        let org = graph.resolve(provider).unwrap();
        assert_eq!(org.first_literal("name").unwrap().value, "Org");

        let published = course.first_literal("datePublished").unwrap();
        assert!(published.datatype.as_deref().unwrap().ends_with("#date"));
    }

    #[test]
    fn test_parse_ntriples() {
        let text = "<https://example.org/x> <http://schema.org/name> \"X\" .\n";
        let graph = parse_ntriples_str(text).unwrap();
        assert_eq!(graph.node("https://example.org/x").unwrap().first_literal("name").unwrap().value, "X");
    }

    #[test]
    fn test_invalid_turtle_is_an_error() {
        assert!(parse_turtle_str("<https://example.org/x> schema:name ").is_err());
    }

    #[test]
    fn test_missing_source_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_source_graph("tess", &dir.path().join("missing.ttl")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_directory_source_keeps_blank_nodes_apart() {
        let dir = tempfile::tempdir().unwrap();
        let doc = |name: &str| {
            format!(
                "@prefix schema: <https://schema.org/> .\n<https://example.org/{name}> schema:provider _:org .\n_:org schema:name \"{name} org\" .\n"
            )
        };
        fs::write(dir.path().join("a.ttl"), doc("a")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("b.ttl"), doc("b")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let graph = load_source_graph("gtn", dir.path()).unwrap();
        let a = graph.node("https://example.org/a").unwrap();
        let b = graph.node("https://example.org/b").unwrap();
        let org_a = graph.resolve(a.first("provider").unwrap()).unwrap();
        let org_b = graph.resolve(b.first("provider").unwrap()).unwrap();
        assert_ne!(org_a.id, org_b.id);
        assert_eq!(org_b.first_literal("name").unwrap().value, "b org");
    }
}
