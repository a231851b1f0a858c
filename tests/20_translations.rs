mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn falls_back_to_static_files() -> Result<()> {
    let app = common::TestApp::new()?;

    let res = app.get("/api/translations/en/home", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"], json!({"hero": {"title": "Accounting"}}));

    // No row and no file
    let res = app.get("/api/translations/es/faq", None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn unknown_locale_or_namespace_is_a_bad_request() -> Result<()> {
    let app = common::TestApp::new()?;

    let res = app.get("/api/translations/fr/home", None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/translations/pt/pricing", None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn saved_content_overrides_the_file() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;
    let content = json!({"hero": {"title": "Nova contabilidade"}});

    let res = app.put("/api/admin/translations/pt/home", None, content.clone()).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.put("/api/admin/translations/pt/home", Some(&token), content.clone()).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["content"], content);

    let res = app.get("/api/translations/pt/home", None).await?;
    assert_eq!(res.body["data"], content);

    // The bundle mixes database and file sources and omits empty namespaces
    let res = app.get("/api/translations/pt", None).await?;
    assert_eq!(res.body["data"]["home"], content);
    assert_eq!(res.body["data"]["common"], json!({"cta": "Fale conosco"}));
    assert!(res.body["data"].get("faq").is_none());
    Ok(())
}

#[tokio::test]
async fn store_outage_serves_static_copy() -> Result<()> {
    let app = common::TestApp::new()?;
    app.store.set_unavailable(true);

    let res = app.get("/api/translations/pt/home", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["hero"]["title"], "Contabilidade");
    Ok(())
}

#[tokio::test]
async fn landing_pages_round_trip_through_the_editor() -> Result<()> {
    let app = common::TestApp::new()?;
    let (_editor, token) = app.user("editor@example.com", "editor").await?;

    let res = app.get("/api/landing/pt/agronegocio", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["hero"], "Agro");

    let res = app
        .put("/api/admin/landing/en/agribusiness", Some(&token), json!({"hero": "Agro EN"}))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(app.content_dir().join("landing/en/agribusiness.json").exists());

    let res = app.get("/api/admin/landing", Some(&token)).await?;
    assert_eq!(res.body["data"].as_array().map(Vec::len), Some(2));

    let res = app.put("/api/admin/landing/en/agribusiness", Some(&token), json!(["not", "an", "object"])).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/landing/es/agronegocio", None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn anonymous_save_is_unauthorized_even_for_unknown_locales() -> Result<()> {
    let app = common::TestApp::new()?;

    let res = app.put("/api/admin/translations/fr/home", None, json!({"hero": {}})).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.put("/api/admin/landing/fr/agro", None, json!({"hero": "x"})).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
