//! 分块下载：发起单块 Range 请求，返回响应供流式读取。

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use reqwest::{Client, Response};
use url::Url;

use crate::internal::block_downloader::structs::download_error::DownloadError;

/// 发起 Range 请求时的参数（形参超过 3 个，用 struct 承载）。
pub(super) struct FetchRangeParams<'a> {
    pub client: &'a Client,
    pub uri: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub begin: u64,
    pub end: u64,
}

/// 生成 Range 请求头：`bytes=begin-end`，两端均为闭区间。
pub(super) fn range_header(begin: u64, end: u64) -> String {
    format!("bytes={begin}-{end}")
}

/// 任务请求头 + Range 头。同名请求头只保留一个值。
fn build_headers(
    headers: &HashMap<String, String>,
    begin: u64,
    end: u64,
) -> Result<HeaderMap, DownloadError> {
    let mut map = HeaderMap::with_capacity(headers.len() + 1);
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| DownloadError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| DownloadError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }

    let range = HeaderValue::from_str(&range_header(begin, end)).map_err(|e| {
        DownloadError::InvalidHeader {
            name: RANGE.to_string(),
            message: e.to_string(),
        }
    })?;
    map.insert(RANGE, range);
    Ok(map)
}

/// 发起单块 Range GET 请求；状态码不在 `[200, 300)` 内时返回 [`DownloadError::ResponseStatus`]。
pub(super) async fn fetch_range_response(
    params: FetchRangeParams<'_>,
) -> Result<Response, DownloadError> {
    let url = Url::parse(params.uri).map_err(|source| DownloadError::InvalidUri {
        uri: params.uri.to_string(),
        source,
    })?;
    let headers = build_headers(params.headers, params.begin, params.end)?;

    let resp = params.client.get(url).headers(headers).send().await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::ResponseStatus(status.as_u16()));
    }
    Ok(resp)
}
