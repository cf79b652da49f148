use goextract::{extract_function, parse_source, print_document, ExtractError, Selection};
use walkdir::WalkDir;

/// Extracts the first statement of the first function body in `src`.
fn extract_first_statement(src: &str) -> Option<Result<String, ExtractError>> {
    let mut doc = parse_source(src).ok()?;
    let (_, body) = doc
        .arena
        .funcs
        .iter()
        .find_map(|(_, f, _)| f.body.map(|b| (f, b)))?;
    let first = *doc.arena.stmts_list(doc.arena.blocks[body].stmts).first()?;
    let span = doc.arena.stmts.span(first);
    let selection = Selection::new(doc.position_of(span.start), doc.position_of(span.end));
    Some(
        extract_function(&mut doc, selection, "extractedForCorpus").map(|_| {
            let printed = print_document(&doc);
            assert_eq!(printed.len() as u32, doc.size(), "size after extraction");
            printed
        }),
    )
}

#[test]
fn extracts_across_go_corpus_if_configured() {
    let Some(root) = std::env::var_os("GOEXTRACT_CORPUS") else {
        eprintln!("GOEXTRACT_CORPUS not set; skipping corpus test");
        return;
    };

    let root = root.to_string_lossy().to_string();
    let mut total = 0usize;
    let mut extracted = 0usize;

    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("go") {
            continue;
        }
        if path.to_string_lossy().contains("testdata") {
            continue;
        }
        let src = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => continue,
        };
        // generics and other unsupported syntax are skipped
        let Ok(doc) = parse_source(&src) else {
            continue;
        };
        total += 1;

        let printed = print_document(&doc);
        let reparsed = parse_source(&printed)
            .unwrap_or_else(|f| panic!("{}: printed text does not parse: {:?}", path.display(), f.diags));
        assert_eq!(print_document(&reparsed), printed, "{}: print is not stable", path.display());

        match extract_first_statement(&src) {
            Some(Ok(text)) => {
                if let Err(f) = parse_source(&text) {
                    panic!("{}: extracted text does not parse: {:?}", path.display(), f.diags);
                }
                extracted += 1;
            }
            Some(Err(err @ ExtractError::LayoutInconsistency { .. })) => {
                panic!("{}: {err}", path.display());
            }
            Some(Err(_)) | None => {}
        }
    }

    eprintln!("Checked {total} Go files, extracted from {extracted}.");
}
