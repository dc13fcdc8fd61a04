//! List and read request pipelines
//!
//! snapshot → parse → before hooks → plan → select strategy → build →
//! execute → attach → project → page → after hooks → assemble

use std::collections::HashMap;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};

use super::error::{ApiError, ApiOperation};
use super::query::ListQuery;
use super::response::{ItemResponse, ResultPage};
use crate::context::FetchContext;
use crate::hooks::{Control, RequestInfo};
use crate::projection::project;
use crate::query;
use crate::resource::ResourceHandle;

/// Serve a list request
pub async fn list(resource: &ResourceHandle, request: Request) -> Response {
    let name = resource.name();
    match fetch_list(resource, request).await {
        Ok(response) => response,
        Err(e) => e.with_resource(name).into_response(),
    }
}

/// Serve a read request
pub async fn read(
    resource: &ResourceHandle,
    params: HashMap<String, String>,
    request: Request,
) -> Response {
    let name = resource.name();
    match fetch_read(resource, params, request).await {
        Ok(response) => response,
        Err(e) => e
            .with_operation(ApiOperation::Read)
            .with_resource(name)
            .into_response(),
    }
}

fn request_info(request: Request, params: HashMap<String, String>) -> RequestInfo {
    let (parts, _body) = request.into_parts();
    RequestInfo {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        params,
    }
}

async fn fetch_list(resource: &ResourceHandle, request: Request) -> Result<Response, ApiError> {
    let definition = resource.snapshot();
    let info = request_info(request, HashMap::new());
    let mut context = ListQuery::from_uri(&info.uri)?.into_context(resource.pagination());

    let fetch = resource.list().fetch();
    if let Control::Respond(response) = fetch.run_before(&info, &mut context).await? {
        return Ok(response);
    }

    let joins = query::plan(&definition.includes);
    let strategy = query::select(&definition, &context);
    let plan = query::build(strategy, &definition, &joins, &context)?;
    tracing::debug!(
        resource = %definition.name,
        %strategy,
        offset = context.offset,
        count = context.count,
        "Fetching page"
    );

    let fetched = query::execute(resource.store(), &plan).await?;
    let rows = joins
        .attach(definition.model.primary_key_column(), fetched.rows)
        .into_iter()
        .map(|record| project(record, &definition.attributes, &joins))
        .collect();
    let range_start = u64::try_from(context.offset).unwrap_or_default();
    context.page = Some(ResultPage::new(rows, fetched.total, range_start));

    if let Control::Respond(response) = fetch.run_after(&info, &mut context).await? {
        return Ok(response);
    }

    let page = context
        .page
        .take()
        .unwrap_or_else(|| ResultPage::new(Vec::new(), fetched.total, range_start));
    Ok(page.into_response())
}

async fn fetch_read(
    resource: &ResourceHandle,
    params: HashMap<String, String>,
    request: Request,
) -> Result<Response, ApiError> {
    let definition = resource.snapshot();
    let id = match params.get("id") {
        Some(id) => id.clone(),
        None => params.values().next().cloned().unwrap_or_default(),
    };
    let info = request_info(request, params);
    let mut context = FetchContext::window(0, 1);

    let fetch = resource.read().fetch();
    if let Control::Respond(response) = fetch.run_before(&info, &mut context).await? {
        return Ok(response);
    }

    let joins = query::plan(&definition.includes);
    let select = query::build_read(&definition, &joins, &id)?;
    tracing::debug!(resource = %definition.name, %id, "Fetching record");

    let rows = resource.store().select_rows(&select).await?;
    let record = joins
        .attach(definition.model.primary_key_column(), rows)
        .into_iter()
        .next()
        .map(|record| project(record, &definition.attributes, &joins))
        .ok_or_else(|| ApiError::not_found(&definition.name, &id))?;
    context.page = Some(ResultPage::new(vec![record], 1, 0));

    if let Control::Respond(response) = fetch.run_after(&info, &mut context).await? {
        return Ok(response);
    }

    context
        .page
        .take()
        .and_then(|page| page.rows.into_iter().next())
        .map(|record| ItemResponse(record).into_response())
        .ok_or_else(|| ApiError::not_found(&definition.name, &id))
}
