#![no_main]

use arbitrary::Arbitrary;
use clinrec::index::DictionaryIndex;
use clinrec::recognizer::{MatchEngine, Recognizer};
use clinrec::utils::{Analyzer, StemLanguage, StemPipeline, WordList};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    labels: Vec<&'a str>,
    text: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let analyzer = Arc::new(Analyzer::new(
        StemPipeline::for_language(StemLanguage::French, 2),
        WordList::french_stopwords(),
        WordList::french_termination_terms(),
    ));
    let lines: Vec<String> = input
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{i}\t{}", label.replace(['\n', '\r'], " ")))
        .collect();
    let Ok(index) = DictionaryIndex::build(lines.iter().map(String::as_str), analyzer) else {
        return;
    };

    let mut engine = MatchEngine::new(Arc::new(index));
    let chars = input.text.chars().count();
    for annotation in engine.recognize(input.text) {
        assert!(annotation.start < annotation.end && annotation.end <= chars);
        assert!(annotation.token_cardinality > 0);
        assert_eq!(
            engine.index().concept_length(annotation.concept_id),
            Some(annotation.token_cardinality)
        );
        let span: String = input
            .text
            .chars()
            .skip(annotation.start)
            .take(annotation.end - annotation.start)
            .collect();
        assert_eq!(span, annotation.matched_text);
    }
});
