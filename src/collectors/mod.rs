pub mod nodes;
pub mod report;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("не удалось создать HTTP-клиент: {0}")]
    Client(#[source] reqwest::Error),
    #[error("запрос к {url} не выполнен: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("{url} вернул HTTP {status}: {body}")]
    Upstream {
        url: String,
        status: u16,
        body: String,
    },
    #[error("некорректный JSON от {url}: {source}")]
    Parse {
        url: String,
        source: serde_json::Error,
    },
    #[error("не удалось прочитать отчёт {path}: {source}")]
    ReadReport {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать отчёт {path}: {source}")]
    ParseReport {
        path: String,
        source: serde_json::Error,
    },
}
