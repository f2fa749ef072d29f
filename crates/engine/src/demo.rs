// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in demo book run by the `snapbook` binary.
//!
//! It exercises dependencies, parametrized bound cases, a port pool,
//! anchors and unordered sets, so a fresh checkout can see the whole
//! review cycle: run (DIFF), accept with `-a`, run again (OK).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::case::{returns, Callable, Case, CaseRegistry, OwnerId};
use crate::error::EngineError;
use crate::pool::ResourcePool;
use crate::token::{tokenize, TokenKind};

const CORPUS: &str = "the quick brown fox jumps over the lazy dog\n\
the dog sleeps 12 hours, the fox 3.5 hours";

/// Word statistics shared by the corpus cases.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct WordStats {
    words: usize,
    numbers: usize,
    counts: BTreeMap<String, usize>,
}

/// A small model configuration, one per bound instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Model {
    name: String,
    window: usize,
}

pub fn registry() -> Result<CaseRegistry, EngineError> {
    let mut registry = CaseRegistry::new();
    register(&mut registry)?;
    Ok(registry)
}

pub fn register(registry: &mut CaseRegistry) -> Result<(), EngineError> {
    let stats = corpus_stats();
    registry.register(Case::new("demo/corpus/stats", &stats))?;
    registry.register(Case::new("demo/corpus/report", &corpus_report()).depends_on(&stats))?;
    registry.register(Case::new("demo/corpus/vocabulary", &vocabulary()).depends_on(&stats))?;
    registry.register(Case::new("demo/tokens", &token_kinds()))?;

    let train = train();
    let evaluate = evaluate();
    for (name, window) in [("small", 2), ("large", 4)] {
        let owner = OwnerId::fresh();
        let config = Callable::new(move |ctx, _| {
            ctx.h1("Model");
            ctx.keyvalueln("name:", name).keyvalueln("window:", window);
            returns(&Model {
                name: name.to_string(),
                window,
            })
        });
        registry.register(Case::new(format!("demo/model/{name}/config"), &config).bound_to(owner))?;
        registry.register(
            Case::new(format!("demo/model/{name}/train"), &train)
                .bound_to(owner)
                .depends_on(&config)
                .depends_on(&stats),
        )?;
        registry.register(
            Case::new(format!("demo/model/{name}/evaluate"), &evaluate)
                .bound_to(owner)
                .depends_on(&train),
        )?;
    }

    let ports = ResourcePool::ports("demo-ports", 18080..18082);
    let serve = serve();
    for name in ["alpha", "beta", "gamma"] {
        registry.register(
            Case::new(format!("demo/servers/{name}"), &serve).depends_on(Arc::clone(&ports)),
        )?;
    }
    Ok(())
}

fn corpus_stats() -> Callable {
    Callable::new(|ctx, _| {
        ctx.h1("Corpus statistics");
        let mut stats = WordStats::default();
        for token in tokenize(CORPUS) {
            match token.kind() {
                TokenKind::Word => {
                    stats.words += 1;
                    *stats.counts.entry(token.text().to_string()).or_default() += 1;
                }
                TokenKind::Number => stats.numbers += 1,
                _ => {}
            }
        }
        ctx.keyvalueln("words:", stats.words)
            .keyvalueln("numbers:", stats.numbers)
            .keyvalueln("distinct:", stats.counts.len());
        returns(&stats)
    })
}

fn corpus_report() -> Callable {
    Callable::new(|ctx, deps| {
        let stats: WordStats = deps.get(0)?;
        ctx.h1("Most common words");
        let mut ranked: Vec<(&String, &usize)> = stats.counts.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        ctx.tlist(
            ranked.iter().take(3).map(|(word, n)| format!("{word} {n}")),
            " * ",
        );
        ctx.it("word count", stats.words)
            .must_apply("be positive", |n| *n > 0)
            .must_equal(stats.counts.values().sum::<usize>());
        Ok(None)
    })
}

fn vocabulary() -> Callable {
    Callable::new(|ctx, deps| {
        let stats: WordStats = deps.get(0)?;
        ctx.h1("Vocabulary");
        ctx.iln("order is not significant:");
        // HashSet iteration order is arbitrary; tset ignores order.
        let words: std::collections::HashSet<&String> = stats.counts.keys().collect();
        ctx.tset(words, " - ");
        Ok(None)
    })
}

fn token_kinds() -> Callable {
    Callable::new(|ctx, _| {
        ctx.h1("Token kinds");
        let sample = "pi is 3.14, isn't it?";
        ctx.keyvalueln("sample:", sample);
        ctx.h2("Tokens");
        ctx.tlist(
            tokenize(sample)
                .into_iter()
                .filter(|t| t.kind() != TokenKind::Whitespace)
                .map(|t| format!("{:?} `{}`", t.kind(), t.text())),
            " * ",
        );
        ctx.h2("Timing");
        ctx.i("tokenize: ");
        ctx.imsln(|| tokenize(CORPUS).len());
        Ok(None)
    })
}

fn train() -> Callable {
    Callable::new(|ctx, deps| {
        let model: Model = deps.get(0)?;
        let stats: WordStats = deps.get(1)?;
        ctx.h1(&format!("Training {}", model.name));
        // Keep the `window` most frequent words.
        let mut ranked: Vec<(String, usize)> = stats.counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(model.window);
        ctx.tlist(ranked.iter().map(|(word, _)| word), " * ");
        let kept: Vec<String> = ranked.into_iter().map(|(word, _)| word).collect();
        returns(&kept)
    })
}

fn evaluate() -> Callable {
    Callable::new(|ctx, deps| {
        let kept: Vec<String> = deps.get(0)?;
        ctx.h1("Evaluation");
        let covered = tokenize(CORPUS)
            .iter()
            .filter(|t| t.kind() == TokenKind::Word && kept.iter().any(|k| k == t.text()))
            .count();
        ctx.keyvalueln("vocabulary:", kept.len())
            .keyvalueln("covered words:", covered);
        ctx.it("coverage", covered)
            .must_apply("cover at least one word", |n| *n > 0);
        Ok(None)
    })
}

fn serve() -> Callable {
    Callable::new(|ctx, deps| {
        let port: u16 = deps.get(0)?;
        ctx.h1("Server");
        ctx.i("listening on port ").iln(&port.to_string());
        ctx.assertln((18080..18082).contains(&port), Some("port outside the pool"));
        Ok(None)
    })
}

#[cfg(test)]
#[path = "demo_tests.rs"]
mod tests;
