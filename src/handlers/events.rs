use actix_web::web::{Data, Payload};
use actix_web::{HttpRequest, HttpResponse};
use actix_ws::Message;
use futures_util::StreamExt;
use log::debug;

use crate::broadcast::Broadcaster;
use crate::context::UserInfo;

// Observers get lifecycle and submission events pushed from here on; there
// is no backlog, current state comes from the read endpoints.
pub async fn subscribe(
    _user_info: UserInfo,
    req: HttpRequest,
    body: Payload,
    broadcaster: Data<Broadcaster>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, mut stream) = actix_ws::handle(&req, body)?;
    let id = broadcaster.register(session.clone());
    debug!("observer {} connected, {} online", id, broadcaster.observer_count());
    actix_web::rt::spawn(async move {
        let mut session = session;
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Ping(bytes) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        broadcaster.unregister(id);
        debug!("observer {} disconnected", id);
    });
    Ok(response)
}
