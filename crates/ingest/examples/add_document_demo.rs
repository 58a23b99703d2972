use ingest::{AddDocumentRequest, DocumentStore};

fn main() {
    let store = DocumentStore::new();

    let first = store
        .add_document(AddDocumentRequest::new("/docs/report.txt", "Q3 revenue grew 12%."))
        .expect("add_document succeeds");
    println!("ingested: {first}");

    // Same location, different content: dedup returns the same id (§4.4).
    let second = store
        .add_document(AddDocumentRequest::new("/docs/report.txt", "Q3 revenue grew 12%. Updated draft."))
        .expect("add_document succeeds");
    println!("deduped to: {second}");
    assert_eq!(first, second);

    let view = store.get_document(&first).expect("document exists");
    println!("status: {:?}, content: {:?}", view.document.status, view.content.map(|c| c.content));
}
