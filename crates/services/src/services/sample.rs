//! Demo family used to seed an empty store.

use db::models::person::{Gender, MaritalStatus, PersonDraft};

/// A person to seed together with the children to seed below them.
#[derive(Debug, Clone)]
pub struct SampleMember {
    pub draft: PersonDraft,
    pub children: Vec<SampleMember>,
}

impl SampleMember {
    /// Members in this subtree, including `self`.
    pub fn member_count(&self) -> usize {
        1 + self.children.iter().map(SampleMember::member_count).sum::<usize>()
    }
}

fn member(
    name: &str,
    birth_year: i32,
    death_year: Option<i32>,
    gender: Gender,
    spouse_name: Option<&str>,
    children: Vec<SampleMember>,
) -> SampleMember {
    SampleMember {
        draft: PersonDraft {
            name: name.to_string(),
            birth_year,
            death_year,
            gender,
            marital_status: if spouse_name.is_some() {
                MaritalStatus::Married
            } else {
                MaritalStatus::Single
            },
            spouse_name: spouse_name.map(str::to_string),
            children_count: None,
            parent_id: None,
        },
        children,
    }
}

pub fn sample_family() -> Vec<SampleMember> {
    let mut fatima = member("فاطمة", 1940, Some(2015), Gender::Female, None, vec![]);
    // married, children not recorded individually
    fatima.draft.marital_status = MaritalStatus::Married;
    fatima.draft.children_count = Some(3);

    vec![member(
        "الجد الأكبر",
        1900,
        Some(1980),
        Gender::Male,
        Some("زينب"),
        vec![
            member(
                "أحمد",
                1930,
                Some(2010),
                Gender::Male,
                Some("فاطمة"),
                vec![
                    member("محمد", 1960, None, Gender::Male, Some("عائشة"), vec![]),
                    member("خالد", 1965, None, Gender::Male, Some("منى"), vec![]),
                ],
            ),
            member("علي", 1935, None, Gender::Male, Some("زينب"), vec![]),
            fatima,
        ],
    )]
}
