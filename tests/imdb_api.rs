use serde_json::json;
use tg_title_lookup::imdb::{self, ImdbClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ImdbClient {
    ImdbClient::with_bases(server.uri(), server.uri())
}

#[tokio::test]
async fn search_keeps_titles_and_drops_people() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/suggestion/m/matrix.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "d": [
                { "id": "tt0133093", "l": "The Matrix", "y": 1999 },
                { "id": "nm0000206", "l": "Keanu Reeves" },
                { "id": "tt0234215", "l": "The Matrix Reloaded", "y": 2003 }
            ]
        })))
        .mount(&server)
        .await;

    let hits = client_for(&server).search("Matrix").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "0133093");
    assert_eq!(hits[0].one_line(), "The Matrix (1999)");
    assert_eq!(hits[1].id, "0234215");
}

#[tokio::test]
async fn search_error_status_means_no_hits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/suggestion/v/void.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(client_for(&server).search("void").await.unwrap().is_empty());
}

#[tokio::test]
async fn title_detail_parses_embedded_json_ld() {
    let ld = json!({
        "@type": "Movie",
        "name": "The Shawshank Redemption",
        "url": "/title/tt0111161/",
        "image": "https://m.media-amazon.com/images/M/shawshank.jpg",
        "description": "Two imprisoned men bond over a number of years.",
        "datePublished": "1994-10-14",
        "contentRating": "R",
        "genre": ["Drama"],
        "keywords": "prison,based on novella,friendship",
        "duration": "PT2H22M",
        "actor": [
            { "@type": "Person", "name": "Tim Robbins", "url": "/name/nm0000209/" },
            { "@type": "Person", "name": "Morgan Freeman", "url": "/name/nm0000151/" }
        ],
        "director": [ { "@type": "Person", "name": "Frank Darabont", "url": "/name/nm0001104/" } ],
        "creator": [
            { "@type": "Organization", "url": "/company/co0007143/" },
            { "@type": "Person", "name": "Stephen King", "url": "/name/nm0000175/" }
        ],
        "aggregateRating": { "ratingValue": 9.3, "ratingCount": 2900000 },
        "trailer": { "url": "https://www.imdb.com/video/vi3877612057/" }
    });
    let page = format!(
        "<html><head><script type=\"application/ld+json\">{ld}</script></head><body></body></html>"
    );

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/title/tt0111161/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html"))
        .mount(&server)
        .await;

    let title = client_for(&server).title("0111161").await.unwrap().unwrap();
    assert_eq!(title.year(), Some(1994));

    let rec = imdb::detail_record(&title, "0111161");
    assert_eq!(
        rec.get("title").map(String::as_str),
        Some("The Shawshank Redemption")
    );
    assert_eq!(rec.get("kind").map(String::as_str), Some("Movie"));
    assert_eq!(rec.get("rating").map(String::as_str), Some("9.3"));
    assert_eq!(rec.get("votes").map(String::as_str), Some("2900000"));
    assert_eq!(rec.get("runtime").map(String::as_str), Some("2h 22m"));
    assert_eq!(rec.get("genres").map(String::as_str), Some("🎭 #Drama"));
    assert_eq!(rec.get("writer").map(String::as_str), Some("Stephen King"));
    assert_eq!(
        rec.get("tags").map(String::as_str),
        Some("prison, based on novella, friendship")
    );
    assert_eq!(
        rec.get("url").map(String::as_str),
        Some("https://www.imdb.com/title/tt0111161/")
    );
    let cast = rec.get("cast").unwrap();
    assert!(
        cast.starts_with(r#"<a href="https://www.imdb.com/name/nm0000209/">Tim Robbins</a>"#),
        "{cast}"
    );
}

#[tokio::test]
async fn title_page_without_json_ld_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/title/tt0000001/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    assert!(client_for(&server).title("0000001").await.unwrap().is_none());
}

#[tokio::test]
async fn title_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/title/tt9999999/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client_for(&server).title("9999999").await.unwrap().is_none());
}

#[tokio::test]
async fn non_numeric_id_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    assert!(client.title("../../etc").await.unwrap().is_none());
    assert!(client.title("").await.unwrap().is_none());
}
