//! Reads a JSONL dataset, curates it and checks the written artifacts.

use std::fs;

use qa_forge::export::{read_jsonl, write_output, OutputPaths};
use qa_forge::lexicon::Lexicon;
use qa_forge::pipeline::{CurationConfig, CurationEngine};
use serde_json::Value;
use tempfile::TempDir;

const INPUT: &str = r#"{"id":"tpl_0001","question":"What is the effect of Śani in the seventh house?","answer":"Śani in the seventh bhāva delays marriage but gives a loyal and mature partner after the thirtieth year.","qa_type":"interpretation","difficulty":"intermediate","source":{"template":"planet_house"},"chapter":7}
{"id":"tpl_0002","question":"WHAT IS THE EFFECT OF ŚANI IN THE SEVENTH HOUSE","answer":"Śani in the seventh bhāva delays marriage but gives a loyal and mature partner after the thirtieth year.","qa_type":"interpretation"}

{"question":"Why is Jupiter considered the greatest benefic among the grahas?","answer":"Jupiter rules wisdom, children and dharma, and its aspect protects the houses it falls on from many afflictions.","qa_type":"explanation"}
{"id":"tpl_0004","question":"What is Rahu?","answer":"Rahu is the north node of the Moon and a shadow graha that magnifies desire and obsession.","qa_type":"definition"}
{"id":"tpl_0005","question":"What is the best way to bake a sourdough loaf at home?","answer":"Feed the starter the night before, mix the dough in the morning and bake it in a hot covered pot for forty minutes.","qa_type":"definition"}
"#;

#[test]
fn test_filter_file_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("raw.jsonl");
    fs::write(&input, INPUT).unwrap();

    let records = read_jsonl(&input).unwrap();
    assert_eq!(records.len(), 5);
    // The record without an id got a derived one.
    assert!(!records[2].id.is_blank());

    let config = CurationConfig::default().with_rebalance(false);
    let engine = CurationEngine::new(config, Lexicon::builtin()).unwrap();
    let output = engine.run(records).unwrap();

    let paths = OutputPaths::for_output(dir.path().join("out").join("clean.jsonl"));
    let summary = write_output(&paths, &output).unwrap();
    assert_eq!(summary.kept, 2);
    assert_eq!(summary.removed, 3);
    assert_eq!(summary.outcomes, 5);

    // Kept records are written back with every producer field, unescaped.
    let kept_text = fs::read_to_string(&paths.kept).unwrap();
    assert!(kept_text.contains("Śani"));
    let kept = read_jsonl(&paths.kept).unwrap();
    assert_eq!(kept[0].id.as_str(), "tpl_0001");
    assert_eq!(kept[0].metadata.qa_type(), "interpretation");
    assert_eq!(kept[0].extra["chapter"], 7);
    assert_eq!(kept[0].metadata.source.as_ref().unwrap()["template"], "planet_house");

    let removed = read_jsonl(&paths.removed).unwrap();
    let removed_ids: Vec<&str> = removed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(removed_ids, vec!["tpl_0002", "tpl_0004", "tpl_0005"]);

    let report: Value = serde_json::from_str(&fs::read_to_string(&paths.report).unwrap()).unwrap();
    assert_eq!(report["stats"]["total"], 5);
    assert_eq!(report["stats"]["by_reason"]["duplicate_exact"], 1);
    assert_eq!(report["stats"]["by_reason"]["too_short_question"], 1);
    assert_eq!(report["stats"]["by_reason"]["off_topic"], 1);
    assert_eq!(report["duplicate_groups"]["tpl_0001"][0], "tpl_0002");
    assert!(report["rebalance"].is_null());

    let outcomes: Vec<Value> = fs::read_to_string(&paths.outcomes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(outcomes[1]["status"], "rejected");
    assert_eq!(outcomes[1]["matched_id"], "tpl_0001");
    assert_eq!(outcomes[0]["status"], "kept");
}

#[test]
fn test_malformed_line_reports_line_number() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.jsonl");
    fs::write(&input, "{\"id\":\"a\",\"question\":\"q\",\"answer\":\"a\"}\n{\"id\": \n").unwrap();

    let err = read_jsonl(&input).unwrap_err();
    assert!(err.to_string().contains("line 2"), "unexpected error: {}", err);
}
