mod handler;

pub use handler::{
    accept_invitation, create_invitation, get_invitation, list_invitations, reject_invitation,
    revoke_invitation,
};
