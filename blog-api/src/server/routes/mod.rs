use crate::server::ServerRouter;

mod pages;
mod posts;
mod tags;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(pages::routes())
        .merge(posts::routes())
        .merge(tags::routes())
}
