//! Character store retention and concurrency tests.

use story_core::store::{CharacterStore, MAX_SAVED_CHARACTERS};
use story_core::Character;
use tempfile::TempDir;

fn kid(name: &str, age: u32) -> Character {
    Character::new(name, age, "cheerful", "puddles").unwrap()
}

#[tokio::test]
async fn test_duplicate_names_are_not_duplicated() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = CharacterStore::in_dir(temp_dir.path());

    store.save(&kid("Mia", 7)).await.unwrap();
    store.save(&kid("Leo", 5)).await.unwrap();
    store.save(&kid("Mia", 9)).await.unwrap();

    let saved = store.load().await;
    let names: Vec<&str> = saved.iter().map(Character::name).collect();
    assert_eq!(names, vec!["Mia", "Leo"]);
    // The first record for a name wins
    assert_eq!(saved[0].age(), 7);
}

#[tokio::test]
async fn test_twenty_first_character_evicts_oldest() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = CharacterStore::in_dir(temp_dir.path());

    let kids: Vec<Character> = (0..MAX_SAVED_CHARACTERS)
        .map(|i| kid(&format!("Kid {i}"), 6))
        .collect();
    store.save_all(&kids).await.unwrap();
    assert_eq!(store.load().await.len(), MAX_SAVED_CHARACTERS);

    store.save(&kid("Newcomer", 8)).await.unwrap();

    let saved = store.load().await;
    assert_eq!(saved.len(), MAX_SAVED_CHARACTERS);
    assert_eq!(saved[0].name(), "Kid 1");
    assert_eq!(saved.last().map(Character::name), Some("Newcomer"));
    assert!(store.find("Kid 0").await.is_none());
}

#[tokio::test]
async fn test_concurrent_saves_both_persist() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let first = CharacterStore::in_dir(temp_dir.path());
    let second = CharacterStore::in_dir(temp_dir.path());

    let a = tokio::spawn(async move { first.save(&kid("Ava", 4)).await });
    let b = tokio::spawn(async move { second.save(&kid("Ben", 10)).await });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let saved = CharacterStore::in_dir(temp_dir.path()).load().await;
    let mut names: Vec<&str> = saved.iter().map(Character::name).collect();
    names.sort();
    assert_eq!(names, vec!["Ava", "Ben"]);
}

#[tokio::test]
async fn test_many_concurrent_saves() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = CharacterStore::in_dir(temp_dir.path());

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.save(&kid(&format!("Kid {i}"), 5)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.load().await.len(), 10);
}

#[tokio::test]
async fn test_corrupt_file_loads_empty_and_is_replaced() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = CharacterStore::in_dir(temp_dir.path());
    std::fs::write(store.path(), "[{\"name\": \"Mia\", \"age\":").unwrap();

    assert!(store.load().await.is_empty());

    store.save(&kid("Leo", 5)).await.unwrap();
    let saved = store.load().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name(), "Leo");
}

#[tokio::test]
async fn test_invalid_records_are_skipped() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = CharacterStore::in_dir(temp_dir.path());
    std::fs::write(
        store.path(),
        r#"[
            {"name": "Mia", "age": 7, "personality": "kind", "favorites": "owls"},
            {"name": "Old", "age": 40, "personality": "", "favorites": ""},
            {"name": "  ", "age": 5}
        ]"#,
    )
    .unwrap();

    let saved = store.load().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].favorites(), "owls");
}

#[tokio::test]
async fn test_file_is_a_json_array() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = CharacterStore::in_dir(temp_dir.path());
    store
        .save(&kid("Mia", 7).with_gender("girl"))
        .await
        .unwrap();

    let content = std::fs::read_to_string(store.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json[0]["name"], "Mia");
    assert_eq!(json[0]["age"], 7);
    assert_eq!(json[0]["gender"], "girl");
    assert!(json[0].get("special_trait").is_none());
}
