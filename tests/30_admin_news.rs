mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use firm_site_api::services::audit::AUDIT_TABLE;

#[tokio::test]
async fn create_publish_and_read_in_every_locale() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;

    let res = app
        .post(
            "/api/admin/categories",
            Some(&token),
            json!({"slug": "tax", "name_pt": "Impostos", "name_en": "Tax", "name_es": "Impuestos", "color": "#1e40af"}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let category_id = res.body["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = app
        .post(
            "/api/admin/news",
            Some(&token),
            json!({
                "slug": "reforma-tributaria",
                "category_id": category_id,
                "status": "published",
                "translations": {
                    "pt": {"title": "Reforma tributária", "excerpt": "O que muda"}
                }
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["translations"].as_array().map(Vec::len), Some(1));
    assert!(res.body["data"]["published_at"].is_string());

    // English readers get the Portuguese text, labelled as such
    let res = app.get("/api/news/reforma-tributaria?locale=en", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["title"], "Reforma tributária");
    assert_eq!(res.body["data"]["locale"], "pt");

    let res = app.get("/api/news?category=tax", None).await?;
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(1));
    let res = app.get("/api/news?category=payroll", None).await?;
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn drafts_stay_private() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;

    let res = app
        .post(
            "/api/admin/news",
            Some(&token),
            json!({"slug": "rascunho", "translations": {"pt": {"title": "Rascunho"}}}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["status"], "draft");

    let res = app.get("/api/news/rascunho", None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get("/api/admin/news?status=draft", Some(&token)).await?;
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(1));

    let res = app.get("/api/admin/news", None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn invalid_input_writes_nothing() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;

    // Missing pt translation
    let res = app
        .post(
            "/api/admin/news",
            Some(&token),
            json!({"slug": "only-english", "translations": {"en": {"title": "English"}}}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Slug pattern
    let res = app
        .post(
            "/api/admin/news",
            Some(&token),
            json!({"slug": "Bad Slug", "translations": {"pt": {"title": "Título"}}}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(app.store.rows("news").is_empty());

    let audit_before = app.store.rows(AUDIT_TABLE).len();
    let body = json!({"slug": "duplicada", "translations": {"pt": {"title": "Um"}}});
    assert_eq!(app.post("/api/admin/news", Some(&token), body.clone()).await?.status, StatusCode::CREATED);
    let res = app.post("/api/admin/news", Some(&token), body).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "CONFLICT");
    assert_eq!(app.store.rows("news").len(), 1);
    assert_eq!(app.store.rows(AUDIT_TABLE).len(), audit_before + 1);
    Ok(())
}

#[tokio::test]
async fn update_audits_only_changed_fields() -> Result<()> {
    let app = common::TestApp::new()?;
    let (editor, token) = app.user("editor@example.com", "editor").await?;

    let res = app
        .post(
            "/api/admin/news",
            Some(&token),
            json!({"slug": "guia", "translations": {"pt": {"title": "A"}}}),
        )
        .await?;
    let id = res.body["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = app
        .put(
            &format!("/api/admin/news/{}", id),
            Some(&token),
            json!({"slug": "guia", "translations": {"pt": {"title": "B"}}}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.store.rows("news_translations").len(), 1);

    let last = app.store.rows(AUDIT_TABLE).pop().unwrap_or_default();
    assert_eq!(last["action"], "update");
    assert_eq!(last["user_id"], editor.id.to_string());
    assert_eq!(last["old_value"]["title"], "A");
    assert_eq!(last["new_value"]["title"], "B");
    Ok(())
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_write() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;
    app.store.fail_writes_to(AUDIT_TABLE);

    let res = app
        .post(
            "/api/admin/partners",
            Some(&token),
            json!({"name": "Banco do Campo", "type": "client"}),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(app.store.rows("partners").len(), 1);

    let res = app.get("/api/partners?type=client", None).await?;
    assert_eq!(res.body["data"][0]["name"], "Banco do Campo");
    Ok(())
}

#[tokio::test]
async fn delete_removes_translations() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;

    let res = app
        .post(
            "/api/admin/testimonials",
            Some(&token),
            json!({
                "name": "Maria Souza",
                "translations": {
                    "pt": {"role": "Diretora", "company": "Agro Sul", "content": "Excelente atendimento."},
                    "es": {"role": "Directora", "company": "Agro Sul", "content": "Excelente atención."}
                }
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.body["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = app.get("/api/testimonials?locale=es", None).await?;
    assert_eq!(res.body["data"][0]["content"], "Excelente atención.");

    let res = app.delete(&format!("/api/admin/testimonials/{}", id), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(app.store.rows("testimonials").is_empty());
    assert!(app.store.rows("testimonial_translations").is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;

    // Missing required field
    let res = app.post("/api/admin/categories", Some(&token), json!({"slug": "tax"})).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(app.store.rows("news_categories").is_empty());

    // Unparseable id
    let res = app.delete("/api/admin/news/not-a-uuid", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "BAD_REQUEST");

    // Bad query value on a public endpoint
    let res = app.get("/api/news?limit=many", None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    Ok(())
}

#[tokio::test]
async fn anonymous_requests_are_rejected_before_input_checks() -> Result<()> {
    let app = common::TestApp::new()?;

    let res = app.post("/api/admin/categories", None, json!({"slug": "tax"})).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["code"], "UNAUTHORIZED");

    let res = app.delete("/api/admin/news/not-a-uuid", None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
