use actix::prelude::*;
use log::{debug, info};
use std::collections::HashMap;

use crate::matchmaking::Envelope;

/// An envelope delivered to one subscriber
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct Delivery(pub Envelope);

#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub id: String,
    pub recipient: Recipient<Delivery>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub id: String,
}

/// Send to every subscriber, the publisher included
#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish(pub Envelope);

#[derive(Message)]
#[rtype(result = "usize")]
pub struct SubscriberCount;

/// The shared broadcast channel all sessions of one server listen on.
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: HashMap<String, Recipient<Delivery>>,
}

impl Actor for BroadcastHub {
    type Context = Context<Self>;
}

impl Handler<Subscribe> for BroadcastHub {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _: &mut Self::Context) {
        self.subscribers.insert(msg.id.clone(), msg.recipient);
        info!("Session {} subscribed; {} listening", msg.id, self.subscribers.len());
    }
}

impl Handler<Unsubscribe> for BroadcastHub {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _: &mut Self::Context) {
        self.subscribers.remove(&msg.id);
        info!("Session {} unsubscribed; {} listening", msg.id, self.subscribers.len());
    }
}

impl Handler<Publish> for BroadcastHub {
    type Result = ();

    fn handle(&mut self, msg: Publish, _: &mut Self::Context) {
        debug!(
            "Publishing {} from {} to {} sessions",
            msg.0.message.kind(),
            msg.0.sender_id,
            self.subscribers.len()
        );
        for recipient in self.subscribers.values() {
            recipient.do_send(Delivery(msg.0.clone()));
        }
    }
}

impl Handler<SubscriberCount> for BroadcastHub {
    type Result = usize;

    fn handle(&mut self, _: SubscriberCount, _: &mut Self::Context) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchmaking::protocol::{ChannelMessage, MatchCancel};

    #[derive(Message)]
    #[rtype(result = "Vec<Envelope>")]
    struct Received;

    #[derive(Default)]
    struct Listener {
        received: Vec<Envelope>,
    }

    impl Actor for Listener {
        type Context = Context<Self>;
    }

    impl Handler<Delivery> for Listener {
        type Result = ();

        fn handle(&mut self, msg: Delivery, _: &mut Self::Context) {
            self.received.push(msg.0);
        }
    }

    impl Handler<Received> for Listener {
        type Result = MessageResult<Received>;

        fn handle(&mut self, _: Received, _: &mut Self::Context) -> Self::Result {
            MessageResult(self.received.clone())
        }
    }

    fn cancel_from(sender: &str) -> Envelope {
        Envelope::new(
            sender,
            ChannelMessage::MatchCancel(MatchCancel {
                match_id: "m1".to_string(),
                reason: "user".to_string(),
            }),
        )
    }

    #[actix_rt::test]
    async fn publish_reaches_every_subscriber_including_sender() {
        let hub = BroadcastHub::default().start();
        let a = Listener::default().start();
        let b = Listener::default().start();
        hub.do_send(Subscribe { id: "a".to_string(), recipient: a.clone().recipient() });
        hub.do_send(Subscribe { id: "b".to_string(), recipient: b.clone().recipient() });
        hub.do_send(Publish(cancel_from("a")));

        // the hub handles messages in order, so deliveries are queued by now
        assert_eq!(hub.send(SubscriberCount).await.unwrap(), 2);
        assert_eq!(a.send(Received).await.unwrap(), vec![cancel_from("a")]);
        assert_eq!(b.send(Received).await.unwrap(), vec![cancel_from("a")]);
    }

    #[actix_rt::test]
    async fn unsubscribed_sessions_hear_nothing() {
        let hub = BroadcastHub::default().start();
        let a = Listener::default().start();
        hub.do_send(Subscribe { id: "a".to_string(), recipient: a.clone().recipient() });
        hub.do_send(Unsubscribe { id: "a".to_string() });
        hub.do_send(Publish(cancel_from("b")));

        assert_eq!(hub.send(SubscriberCount).await.unwrap(), 0);
        assert!(a.send(Received).await.unwrap().is_empty());
    }
}
