mod auth;
mod cache;
mod pricing;
mod providers;
mod validation;
mod webhooks;
