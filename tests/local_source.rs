// Répertoire de données local : lecture, filtres, records invalides

use std::path::PathBuf;

use benchwatch::api::{FetchRequest, LocalDataDir};
use benchwatch::models::RangeToken;

fn data_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("benchwatch-local-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let files = [
        (
            "brent.json",
            r#"{"name": "Brent Crude", "category": "energy", "price": 82.1, "unit": "bbl",
                "history": [{"date": "2024-01-02", "price": 76.0},
                            {"date": "2024-02-28", "price": 80.5},
                            {"date": "2024-03-04", "price": 82.1}]}"#,
        ),
        (
            "gold.json",
            r#"{"id": "gold", "name": "Gold", "category": "precious", "price": 2100.0,
                "history": [{"date": "2024-03-01", "price": 2080.0},
                            {"date": "2024-03-04", "price": 2100.0}]}"#,
        ),
        ("schema.json", r#"{"type": "object"}"#),
        ("broken.json", r#"{"name": 42"#),
        ("notes.txt", "not a record"),
    ];
    for (file, content) in files {
        std::fs::write(dir.join(file), content).unwrap();
    }
    dir
}

#[tokio::test]
async fn reads_every_record_sorted_by_name() {
    let source = LocalDataDir::new(data_dir("all"), true);
    let commodities = source
        .fetch_commodities(&FetchRequest::new(RangeToken::All, "all"))
        .await
        .unwrap();

    let names: Vec<&str> = commodities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Brent Crude", "Gold"]);
    // Identifiant déduit du nom de fichier
    assert_eq!(commodities[0].id, "brent");
}

#[tokio::test]
async fn category_and_range_are_applied() {
    let source = LocalDataDir::new(data_dir("filters"), false);
    let commodities = source
        .fetch_commodities(&FetchRequest::new(RangeToken::OneWeek, "energy"))
        .await
        .unwrap();

    assert_eq!(commodities.len(), 1);
    let brent = &commodities[0];
    assert_eq!(brent.history.len(), 2);
    assert_eq!(brent.price, 82.1);
}

#[tokio::test]
async fn missing_directory_is_empty() {
    let source = LocalDataDir::new(std::env::temp_dir().join("benchwatch-does-not-exist"), false);
    let commodities = source
        .fetch_commodities(&FetchRequest::new(RangeToken::All, "all"))
        .await
        .unwrap();
    assert!(commodities.is_empty());
}
