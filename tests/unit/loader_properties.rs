use std::sync::Arc;
use std::time::Duration;

use codevar::core::CodevarError;
use codevar::loader::{LoadFileOptions, LoadedVariant, load_variant};
use codevar::models::{LoadedSource, VariantEntry};
use codevar::sources::{Collaborators, SourceLoader};
use codevar::test_utils::{MockSourceLoader, init_test_logging};

fn collaborators(loader: &Arc<MockSourceLoader>) -> Collaborators {
    Collaborators::new().with_source_loader(loader.clone() as Arc<dyn SourceLoader>)
}

async fn load(url: &str, loader: &Arc<MockSourceLoader>) -> Result<LoadedVariant, CodevarError> {
    load_variant(
        url,
        "Default",
        Some(VariantEntry::Url(url.to_string())),
        &collaborators(loader),
        &LoadFileOptions::new().without_parsing(),
    )
    .await
}

fn keys(loaded: &LoadedVariant) -> Vec<String> {
    loaded.code.extra_files.as_ref().map(|files| files.keys().cloned().collect()).unwrap_or_default()
}

/// entry -> components/Button.js -> ../styles/button.css -> ./tokens.css
fn deep_graph() -> MockSourceLoader {
    MockSourceLoader::new()
        .with_source(
            "file:///site/demo/index.js",
            LoadedSource::text("index")
                .with_extra_file("components/Button.js", "file:///site/demo/components/Button.js"),
        )
        .with_source(
            "file:///site/demo/components/Button.js",
            LoadedSource::text("button")
                .with_extra_file("../styles/button.css", "file:///site/demo/styles/button.css"),
        )
        .with_source(
            "file:///site/demo/styles/button.css",
            LoadedSource::text("css").with_extra_file("./tokens.css", "file:///site/demo/styles/tokens.css"),
        )
        .with_text("file:///site/demo/styles/tokens.css", "tokens")
}

#[tokio::test]
async fn test_keys_stay_relative_to_entrypoint_at_any_depth() {
    init_test_logging(None);
    let loader = Arc::new(deep_graph());

    let loaded = load("file:///site/demo/index.js", &loader).await.unwrap();

    assert_eq!(
        keys(&loaded),
        vec!["components/Button.js", "styles/button.css", "styles/tokens.css"]
    );
}

#[tokio::test]
async fn test_dependency_order_is_deterministic() {
    let mut previous: Option<Vec<String>> = None;
    for _ in 0..5 {
        let loader = Arc::new(deep_graph().with_latency(Duration::from_millis(1)));
        let loaded = load("file:///site/demo/index.js", &loader).await.unwrap();
        if let Some(previous) = &previous {
            assert_eq!(previous, &loaded.dependencies);
        }
        previous = Some(loaded.dependencies);
    }
    assert_eq!(
        previous.unwrap(),
        vec![
            "file:///site/demo/index.js",
            "file:///site/demo/components/Button.js",
            "file:///site/demo/styles/button.css",
            "file:///site/demo/styles/tokens.css",
        ]
    );
}

#[tokio::test]
async fn test_shared_file_is_fetched_once_across_branches() {
    let mut loader = MockSourceLoader::new().with_source(
        "file:///demo/index.js",
        LoadedSource::text("index")
            .with_extra_file("a.js", "file:///demo/a.js")
            .with_extra_file("b.js", "file:///demo/b.js")
            .with_extra_file("c.js", "file:///demo/c.js"),
    );
    for name in ["a", "b", "c"] {
        loader = loader.with_source(
            format!("file:///demo/{name}.js"),
            LoadedSource::text(name).with_extra_file("lib/shared.js", "file:///demo/lib/shared.js"),
        );
    }
    let loader = Arc::new(
        loader.with_text("file:///demo/lib/shared.js", "shared").with_latency(Duration::from_millis(10)),
    );

    let loaded = load("file:///demo/index.js", &loader).await.unwrap();

    assert_eq!(loader.calls("file:///demo/lib/shared.js"), 1);
    assert_eq!(loader.total_calls(), 5);
    assert_eq!(keys(&loaded), vec!["a.js", "lib/shared.js", "b.js", "c.js"]);
    assert_eq!(loaded.dependencies.len(), 5);
}

#[tokio::test]
async fn test_cycles_of_any_length_are_detected() {
    // Self reference
    let loader = Arc::new(MockSourceLoader::new().with_source(
        "file:///x.js",
        LoadedSource::text("").with_extra_file("x.js", "file:///x.js"),
    ));
    assert_eq!(
        load("file:///x.js", &loader).await.unwrap_err().to_string(),
        "Circular dependency detected: file:///x.js"
    );

    // entry -> a -> b -> c -> a
    let loader = Arc::new(
        MockSourceLoader::new()
            .with_source("file:///entry.js", LoadedSource::text("").with_extra_file("a.js", "file:///a.js"))
            .with_source("file:///a.js", LoadedSource::text("").with_extra_file("b.js", "file:///b.js"))
            .with_source("file:///b.js", LoadedSource::text("").with_extra_file("c.js", "file:///c.js"))
            .with_source("file:///c.js", LoadedSource::text("").with_extra_file("a.js", "file:///a.js")),
    );
    let err = tokio::time::timeout(Duration::from_secs(5), load("file:///entry.js", &loader))
        .await
        .expect("cycle detection must not hang")
        .unwrap_err();
    assert_eq!(err, CodevarError::CircularDependency { url: "file:///a.js".to_string() });
}

#[tokio::test]
async fn test_back_reference_to_entrypoint_is_circular() {
    let loader = Arc::new(
        MockSourceLoader::new()
            .with_source("file:///entry.js", LoadedSource::text("").with_extra_file("a.js", "file:///a.js"))
            .with_source(
                "file:///a.js",
                LoadedSource::text("").with_extra_file("entry.js", "file:///entry.js"),
            ),
    );
    assert_eq!(
        load("file:///entry.js", &loader).await.unwrap_err(),
        CodevarError::CircularDependency { url: "file:///entry.js".to_string() }
    );
}

#[tokio::test]
async fn test_depth_limit_is_inclusive() {
    let loader = Arc::new(deep_graph());
    let collaborators = collaborators(&loader);
    let entry = || Some(VariantEntry::Url("file:///site/demo/index.js".to_string()));

    // The deepest file is three hops from the entrypoint
    let ok = load_variant(
        "file:///site/demo/index.js",
        "Default",
        entry(),
        &collaborators,
        &LoadFileOptions::new().without_parsing().with_max_depth(3),
    )
    .await;
    assert!(ok.is_ok());

    let err = load_variant(
        "file:///site/demo/index.js",
        "Default",
        entry(),
        &collaborators,
        &LoadFileOptions::new().without_parsing().with_max_depth(2),
    )
    .await
    .unwrap_err();
    assert_eq!(err, CodevarError::MaxDepthExceeded);
}

#[tokio::test]
async fn test_loader_failure_aborts_the_run() {
    let loader = Arc::new(
        MockSourceLoader::new()
            .with_source(
                "file:///demo/index.js",
                LoadedSource::text("")
                    .with_extra_file("ok.js", "file:///demo/ok.js")
                    .with_extra_file("broken.js", "file:///demo/broken.js"),
            )
            .with_text("file:///demo/ok.js", "ok")
            .with_failure("file:///demo/broken.js", "permission denied"),
    );

    let err = load("file:///demo/index.js", &loader).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to load source code from file:///demo/broken.js: permission denied"
    );
}

/// `layers` layers of `width` files; every file declares the whole next layer.
fn layered_graph(layers: usize, width: usize) -> MockSourceLoader {
    let layer = |index: usize| -> Vec<(String, String)> {
        (0..width)
            .map(|i| (format!("l{index}_{i}.js"), format!("file:///dag/l{index}_{i}.js")))
            .collect()
    };
    let declaring = |text: &str, next: &[(String, String)]| {
        next.iter().fold(LoadedSource::text(text), |source, (key, url)| source.with_extra_file(key, url))
    };

    let mut loader = MockSourceLoader::new().with_source("file:///dag/index.js", declaring("index", &layer(0)));
    for index in 0..layers {
        let next = if index + 1 < layers { layer(index + 1) } else { Vec::new() };
        for (key, url) in layer(index) {
            loader = loader.with_source(url, declaring(&key, &next));
        }
    }
    loader
}

#[tokio::test]
async fn test_densely_shared_files_resolve_in_one_pass() {
    // 4^9 distinct paths reach the last layer
    let loader = Arc::new(layered_graph(9, 4));

    let loaded = tokio::time::timeout(Duration::from_secs(5), load("file:///dag/index.js", &loader))
        .await
        .expect("shared files must not be walked once per path")
        .unwrap();

    assert_eq!(loader.total_calls(), 37);
    assert_eq!(loaded.dependencies.len(), 37);
    let keys = keys(&loaded);
    assert_eq!(keys.len(), 36);
    assert_eq!(&keys[..3], ["l0_0.js", "l1_0.js", "l2_0.js"]);
}
