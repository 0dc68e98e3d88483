//! Inbound message routing.
//!
//! Decides what a decoded message means for a session in a given handshake
//! state. Only a `Connected` session reaches the race.

use crate::codec::{BoatActionKind, JoinRole, Message};
use crate::network::handshake::ConnectionState;

/// What to do with an inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Start the join handshake.
    Join(JoinRole),
    /// Refresh the peer's liveness.
    Heartbeat,
    /// Forward a control action to the race.
    Action(BoatActionKind),
    /// Nothing to do.
    Ignore,
}

/// Route `message` for a session in `state`.
pub fn route(state: ConnectionState, message: &Message) -> Route {
    match message {
        Message::Heartbeat(_) => Route::Heartbeat,
        Message::RequestToJoin(request) if state == ConnectionState::Unknown => {
            Route::Join(request.role)
        }
        Message::BoatAction(action) if state == ConnectionState::Connected => {
            Route::Action(action.action)
        }
        _ => Route::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BoatAction, Heartbeat, RequestToJoin};

    const ALL_STATES: [ConnectionState; 5] = [
        ConnectionState::Unknown,
        ConnectionState::RequestReceived,
        ConnectionState::Connected,
        ConnectionState::Declined,
        ConnectionState::TimedOut,
    ];

    fn action() -> Message {
        Message::BoatAction(BoatAction {
            action: BoatActionKind::TackGybe,
        })
    }

    #[test]
    fn test_only_connected_routes_actions() {
        for state in ALL_STATES {
            let expected = if state == ConnectionState::Connected {
                Route::Action(BoatActionKind::TackGybe)
            } else {
                Route::Ignore
            };
            assert_eq!(route(state, &action()), expected, "{:?}", state);
        }
    }

    #[test]
    fn test_heartbeat_in_every_state() {
        let heartbeat = Message::Heartbeat(Heartbeat { sequence: 9 });
        for state in ALL_STATES {
            assert_eq!(route(state, &heartbeat), Route::Heartbeat);
        }
    }

    #[test]
    fn test_join_only_from_unknown() {
        let join = Message::RequestToJoin(RequestToJoin {
            role: JoinRole::Ghost,
        });
        assert_eq!(route(ConnectionState::Unknown, &join), Route::Join(JoinRole::Ghost));
        assert_eq!(route(ConnectionState::Connected, &join), Route::Ignore);
        assert_eq!(route(ConnectionState::RequestReceived, &join), Route::Ignore);
    }

    #[test]
    fn test_server_messages_are_ignored() {
        let unknown = Message::Unrecognized {
            code: 250,
            body: vec![1, 2, 3],
        };
        assert_eq!(route(ConnectionState::Connected, &unknown), Route::Ignore);
    }
}
