mod content_api_reqwest;

pub use content_api_reqwest::ReqwestGithubContentApi;
