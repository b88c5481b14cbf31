// src/services/capacity_guard.rs

//! Decisão pura sobre aprovações: estoque do ativo e assentos do tenant.
//! Nada aqui lê ou grava no ledger; o chamador passa um snapshot
//! consistente e aplica a decisão no mesmo commit.

use crate::{
    common::error::RejectionReason,
    models::{
        affiliation::Affiliation,
        asset::Asset,
        request::AssetRequest,
        user::User,
    },
};

/// Efeitos colaterais que a aprovação deve aplicar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalEffects {
    pub create_affiliation: bool,
    pub decrement_asset: bool,
    pub increment_seat_count: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve(ApprovalEffects),
    Reject(RejectionReason),
}

/// Regras, nesta ordem:
/// 1. sem estoque -> `AssetUnavailable`
/// 2. sem afiliação e sem assento livre -> `SeatLimitExceeded`
/// 3. caso contrário aprova; só cria afiliação (e ocupa assento) se ela
///    ainda não existir.
pub fn decide_approval(
    _request: &AssetRequest,
    tenant: &User,
    asset: &Asset,
    affiliation_exists: bool,
) -> Decision {
    if !asset.in_stock() {
        return Decision::Reject(RejectionReason::AssetUnavailable);
    }

    // current + 1 > limit
    if !affiliation_exists && tenant.remaining_seats() < 1 {
        return Decision::Reject(RejectionReason::SeatLimitExceeded);
    }

    let create_affiliation = !affiliation_exists;
    Decision::Approve(ApprovalEffects {
        create_affiliation,
        decrement_asset: true,
        increment_seat_count: create_affiliation,
    })
}

/// Atribuição direta pelo RH: exige vínculo ativo e ativo próprio com estoque.
/// Ativo inexistente conta como "não pertence ao RH".
/// Devolve o par (ativo, afiliação) que sustenta a decisão.
pub fn decide_direct_assignment<'a>(
    hr_email: &str,
    asset: Option<&'a Asset>,
    affiliation: Option<&'a Affiliation>,
) -> Result<(&'a Asset, &'a Affiliation), RejectionReason> {
    let affiliation = affiliation
        .filter(|a| a.is_active())
        .ok_or(RejectionReason::NotAffiliated)?;
    let asset = asset
        .filter(|a| a.is_owned_by(hr_email))
        .ok_or(RejectionReason::AssetNotOwned)?;
    if !asset.in_stock() {
        return Err(RejectionReason::AssetUnavailable);
    }
    Ok((asset, affiliation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        request::RequestStatus,
        user::UserRole,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn tenant(limit: i32, current: i32) -> User {
        User {
            id: Uuid::new_v4(),
            email: "rh@acme.com".into(),
            name: "RH".into(),
            photo_url: None,
            role: UserRole::Hr,
            company_name: Some("Acme".into()),
            company_logo: None,
            package_limit: limit,
            current_employees: current,
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn asset(quantity: i32) -> Asset {
        Asset {
            id: Uuid::new_v4(),
            owner_tenant_email: "rh@acme.com".into(),
            name: "Notebook".into(),
            asset_type: "returnable".into(),
            image: None,
            quantity,
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn request(asset: &Asset) -> AssetRequest {
        AssetRequest {
            id: Uuid::new_v4(),
            asset_id: asset.id,
            asset_name: asset.name.clone(),
            asset_type: asset.asset_type.clone(),
            requester_email: "ana@acme.com".into(),
            requester_name: "Ana".into(),
            requester_photo: None,
            hr_email: "rh@acme.com".into(),
            company_name: "Acme".into(),
            note: None,
            request_date: Utc::now(),
            request_status: RequestStatus::Pending,
            approval_date: None,
            processed_by: None,
            version: 0,
        }
    }

    #[test]
    fn first_affiliation_takes_a_seat() {
        let a = asset(3);
        let decision = decide_approval(&request(&a), &tenant(5, 0), &a, false);
        assert_eq!(
            decision,
            Decision::Approve(ApprovalEffects {
                create_affiliation: true,
                decrement_asset: true,
                increment_seat_count: true,
            })
        );
    }

    #[test]
    fn out_of_stock_wins_over_seat_limit() {
        let a = asset(0);
        let decision = decide_approval(&request(&a), &tenant(1, 1), &a, false);
        assert_eq!(decision, Decision::Reject(RejectionReason::AssetUnavailable));
    }

    #[test]
    fn full_package_rejects_new_employee() {
        let a = asset(2);
        let decision = decide_approval(&request(&a), &tenant(1, 1), &a, false);
        assert_eq!(decision, Decision::Reject(RejectionReason::SeatLimitExceeded));
    }

    #[test]
    fn existing_affiliation_skips_seat_check() {
        let a = asset(2);
        let decision = decide_approval(&request(&a), &tenant(1, 1), &a, true);
        assert_eq!(
            decision,
            Decision::Approve(ApprovalEffects {
                create_affiliation: false,
                decrement_asset: true,
                increment_seat_count: false,
            })
        );
    }

    #[test]
    fn zero_limit_package_never_affiliates() {
        let a = asset(1);
        let decision = decide_approval(&request(&a), &tenant(0, 0), &a, false);
        assert_eq!(decision, Decision::Reject(RejectionReason::SeatLimitExceeded));
    }

    #[test]
    fn direct_assignment_rules() {
        let hr = tenant(5, 1);
        let a = asset(1);
        let link = Affiliation::activate("ana@acme.com", &hr);

        let empty = asset(0);

        assert_eq!(
            decide_direct_assignment("rh@acme.com", Some(&a), None).unwrap_err(),
            RejectionReason::NotAffiliated
        );
        assert_eq!(
            decide_direct_assignment("rh@acme.com", Some(&empty), Some(&link)).unwrap_err(),
            RejectionReason::AssetUnavailable
        );
        assert_eq!(
            decide_direct_assignment("outro@beta.com", Some(&a), Some(&link)).unwrap_err(),
            RejectionReason::AssetNotOwned
        );
        assert_eq!(
            decide_direct_assignment("rh@acme.com", None, Some(&link)).unwrap_err(),
            RejectionReason::AssetNotOwned
        );
        let (chosen, via) = decide_direct_assignment("rh@acme.com", Some(&a), Some(&link)).unwrap();
        assert_eq!((chosen.id, via.id), (a.id, link.id));
    }
}
